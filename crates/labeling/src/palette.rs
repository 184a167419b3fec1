/// Colors indexed by key binding. The default is Tableau 10.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryPalette {
    colors: [String; 10],
}

const TABLEAU_10: [&str; 10] = [
    "rgba(103, 191, 92, .75)",
    "rgba(237, 102, 93, .75)",
    "rgba(255, 158, 74, .75)",
    "rgba(114, 158, 206, .75)",
    "rgba(173, 139, 201, .75)",
    "rgba(168, 120, 110, .75)",
    "rgba(237, 151, 202, .75)",
    "rgba(162, 162, 162, .75)",
    "rgba(205, 204, 93, .75)",
    "rgba(109, 204, 218, .75)",
];

impl CategoryPalette {
    pub fn new(colors: [String; 10]) -> Self {
        Self { colors }
    }

    pub fn color_for(&self, key_binding: u8) -> &str {
        &self.colors[key_binding as usize % self.colors.len()]
    }
}

impl Default for CategoryPalette {
    fn default() -> Self {
        Self { colors: TABLEAU_10.map(String::from) }
    }
}

/// Key bindings in assignment order: 1..=9 then 0 (the 0 key sits after 9 on
/// the number row).
pub fn key_binding_for(position: usize) -> u8 {
    ((position + 1) % 10) as u8
}
