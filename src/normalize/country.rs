//! Country inference from author affiliations.
//!
//! Affiliation strings usually end with the country ("Dept. of Biology,
//! University of X, City, Country"), so segments are scanned from the end.
//! This is a heuristic, not a gazetteer; anything unmatched stays unknown.

/// Country names and common aliases, lower-case, mapped to ISO 3166-1
/// alpha-3 codes.
const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("usa", "USA"),
    ("u.s.a", "USA"),
    ("united states", "USA"),
    ("uk", "GBR"),
    ("u.k", "GBR"),
    ("united kingdom", "GBR"),
    ("england", "GBR"),
    ("scotland", "GBR"),
    ("wales", "GBR"),
    ("germany", "DEU"),
    ("deutschland", "DEU"),
    ("china", "CHN"),
    ("p.r. china", "CHN"),
    ("prc", "CHN"),
    ("japan", "JPN"),
    ("india", "IND"),
    ("france", "FRA"),
    ("italy", "ITA"),
    ("spain", "ESP"),
    ("canada", "CAN"),
    ("australia", "AUS"),
    ("brazil", "BRA"),
    ("south korea", "KOR"),
    ("republic of korea", "KOR"),
    ("korea", "KOR"),
    ("netherlands", "NLD"),
    ("the netherlands", "NLD"),
    ("sweden", "SWE"),
    ("switzerland", "CHE"),
    ("austria", "AUT"),
    ("belgium", "BEL"),
    ("denmark", "DNK"),
    ("norway", "NOR"),
    ("finland", "FIN"),
    ("poland", "POL"),
    ("portugal", "PRT"),
    ("greece", "GRC"),
    ("ireland", "IRL"),
    ("israel", "ISR"),
    ("turkey", "TUR"),
    ("russia", "RUS"),
    ("russian federation", "RUS"),
    ("mexico", "MEX"),
    ("argentina", "ARG"),
    ("chile", "CHL"),
    ("colombia", "COL"),
    ("south africa", "ZAF"),
    ("egypt", "EGY"),
    ("nigeria", "NGA"),
    ("kenya", "KEN"),
    ("iran", "IRN"),
    ("saudi arabia", "SAU"),
    ("united arab emirates", "ARE"),
    ("uae", "ARE"),
    ("singapore", "SGP"),
    ("taiwan", "TWN"),
    ("hong kong", "HKG"),
    ("thailand", "THA"),
    ("malaysia", "MYS"),
    ("indonesia", "IDN"),
    ("vietnam", "VNM"),
    ("philippines", "PHL"),
    ("pakistan", "PAK"),
    ("bangladesh", "BGD"),
    ("new zealand", "NZL"),
    ("czech republic", "CZE"),
    ("czechia", "CZE"),
    ("hungary", "HUN"),
    ("romania", "ROU"),
    ("ukraine", "UKR"),
];

/// Infer an alpha-3 country code from a free-text affiliation.
pub fn from_affiliation(affiliation: &str) -> Option<String> {
    // Comma-separated segments, last first: the country is almost always
    // the trailing segment.
    for segment in affiliation.rsplit(',') {
        let segment = segment
            .trim()
            .trim_end_matches(['.', ';'])
            .to_lowercase();
        if segment.is_empty() {
            continue;
        }
        for (alias, code) in COUNTRY_ALIASES {
            if segment == *alias || segment.contains(alias) {
                return Some((*code).to_string());
            }
        }
    }
    None
}
