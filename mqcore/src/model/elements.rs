/// Single-bond covalent radii (Å) of the elements commonly found in
/// biomolecular structures.
const COVALENT_RADII: &[(&str, f64)] = &[
    ("H", 0.31),
    ("D", 0.31),
    ("B", 0.84),
    ("C", 0.76),
    ("N", 0.71),
    ("O", 0.66),
    ("F", 0.57),
    ("NA", 1.66),
    ("MG", 1.41),
    ("AL", 1.21),
    ("SI", 1.11),
    ("P", 1.07),
    ("S", 1.05),
    ("CL", 1.02),
    ("K", 2.03),
    ("CA", 1.76),
    ("MN", 1.39),
    ("FE", 1.32),
    ("CO", 1.26),
    ("NI", 1.24),
    ("CU", 1.32),
    ("ZN", 1.22),
    ("SE", 1.20),
    ("BR", 1.20),
    ("I", 1.39),
];

/// Radius used for elements missing from the table.
pub const DEFAULT_COVALENT_RADIUS: f64 = 1.5;

pub fn covalent_radius(element: &str) -> f64 {
    COVALENT_RADII
        .iter()
        .find(|(symbol, _)| symbol.eq_ignore_ascii_case(element))
        .map_or(DEFAULT_COVALENT_RADIUS, |(_, r)| *r)
}

pub fn is_hydrogen(element: &str) -> bool {
    element.eq_ignore_ascii_case("H") || element.eq_ignore_ascii_case("D")
}

/// Metals never receive inferred covalent bonds.
pub fn is_metal(element: &str) -> bool {
    const METALS: [&str; 11] = ["NA", "MG", "AL", "K", "CA", "MN", "FE", "CO", "NI", "CU", "ZN"];
    METALS.iter().any(|m| m.eq_ignore_ascii_case(element))
}

/// Canonical spelling of an element symbol (upper case).
pub fn normalize(element: &str) -> String {
    element.trim().to_ascii_uppercase()
}
