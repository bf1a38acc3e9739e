//! Placeholder names.
//!
//! Every constant and stream variable gets a fresh name, unique within one
//! compilation. Counters only move forward.
//!
//! | Family               | Counter     | Name                 |
//! |----------------------|-------------|----------------------|
//! | constant             | constants   | `constN`             |
//! | stream variable      | stream vars | `streamVarN`         |
//! | pattern constant     | constants   | `pattern-valueN`     |
//! | pattern stream var   | stream vars | `pattern-variableN`  |

/// Prefix shared by every pattern-content placeholder.
pub const PATTERN_PREFIX: &str = "pattern-";

#[derive(Debug, Default)]
pub struct PlaceholderNames {
    constants: usize,
    stream_vars: usize,
}

impl PlaceholderNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(&mut self, pattern: bool) -> String {
        let name = if pattern {
            format!("{}value{}", PATTERN_PREFIX, self.constants)
        } else {
            format!("const{}", self.constants)
        };
        self.constants += 1;
        name
    }

    pub fn stream_var(&mut self, pattern: bool) -> String {
        let name = if pattern {
            format!("{}variable{}", PATTERN_PREFIX, self.stream_vars)
        } else {
            format!("streamVar{}", self.stream_vars)
        };
        self.stream_vars += 1;
        name
    }
}

/// Whether a generated name belongs to a pattern-content family.
pub fn is_pattern(name: &str) -> bool {
    name.starts_with(PATTERN_PREFIX)
}
