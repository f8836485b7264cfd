use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    Knife,
    Shotgun,
    Sniper,
    Smg,
    Pistol,
    Rifle,
    Lmg,
    Grenade,
    Default,
}

#[derive(Clone, Copy, Debug)]
enum Pattern {
    Contains(&'static str),
    Exact(&'static str),
}

impl Pattern {
    fn matches(self, weapon: &str) -> bool {
        match self {
            Self::Contains(needle) => weapon.contains(needle),
            Self::Exact(name) => weapon == name,
        }
    }
}

/// Evaluated top to bottom; the first class with a matching pattern wins.
const CLASSIFICATION: &[(WeaponClass, &[Pattern])] = &[
    (
        WeaponClass::Grenade,
        &[
            Pattern::Contains("grenade"),
            Pattern::Contains("molotov"),
            Pattern::Contains("flashbang"),
            Pattern::Contains("smoke"),
            Pattern::Contains("decoy"),
            Pattern::Contains("incendiary"),
        ],
    ),
    (
        WeaponClass::Knife,
        &[Pattern::Contains("knife"), Pattern::Exact("weapon_bayonet")],
    ),
    (
        WeaponClass::Shotgun,
        &[
            Pattern::Contains("nova"),
            Pattern::Contains("xm1014"),
            Pattern::Contains("mag7"),
            Pattern::Contains("sawedoff"),
        ],
    ),
    (
        WeaponClass::Sniper,
        &[
            Pattern::Contains("awp"),
            Pattern::Contains("ssg08"),
            Pattern::Contains("g3sg1"),
            Pattern::Contains("scar20"),
        ],
    ),
    (
        WeaponClass::Smg,
        &[
            Pattern::Contains("mp9"),
            Pattern::Contains("mp7"),
            Pattern::Contains("mp5"),
            Pattern::Contains("mac10"),
            Pattern::Contains("ump45"),
            Pattern::Contains("bizon"),
            Pattern::Contains("p90"),
        ],
    ),
    (
        WeaponClass::Pistol,
        &[
            Pattern::Contains("glock"),
            Pattern::Contains("hkp2000"),
            Pattern::Contains("usp"),
            Pattern::Contains("p250"),
            Pattern::Contains("elite"),
            Pattern::Contains("fiveseven"),
            Pattern::Contains("tec9"),
            Pattern::Contains("cz75a"),
            Pattern::Contains("deagle"),
            Pattern::Contains("revolver"),
        ],
    ),
    (
        WeaponClass::Rifle,
        &[
            Pattern::Contains("ak47"),
            Pattern::Contains("m4a1"),
            Pattern::Contains("galil"),
            Pattern::Contains("famas"),
            Pattern::Contains("aug"),
            Pattern::Contains("sg556"),
        ],
    ),
    (
        WeaponClass::Lmg,
        &[Pattern::Contains("negev"), Pattern::Contains("m249")],
    ),
];

impl WeaponClass {
    pub fn classify(weapon: &str) -> Self {
        let weapon = weapon.trim().to_ascii_lowercase();
        CLASSIFICATION
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|pattern| pattern.matches(&weapon)))
            .map(|(class, _)| *class)
            .unwrap_or(Self::Default)
    }

    /// Area weapons never create penalty credits.
    pub fn is_area(self) -> bool {
        self == Self::Grenade
    }
}
