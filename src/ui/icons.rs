pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const PEN: &str = "✏️";
    pub const KEY: &str = "🔑";
    pub const DRY: &str = "🧪";
    pub const UNDO: &str = "↩️";
}
