pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, info, section, statement, success, warn};
pub use table::{outcome_table, registry_table, TableBuilder};
pub use theme::{theme, Theme};
