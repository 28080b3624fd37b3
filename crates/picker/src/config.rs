#![forbid(unsafe_code)]

/// Picker tuning read from `LAKESCOPE_*` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerConfig {
    pub page_size: usize,
    pub scroll_threshold_px: u32,
    pub column_height: u32,
    pub column_count: usize,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self { page_size: 50, scroll_threshold_px: 48, column_height: 300, column_count: 1 }
    }
}

fn env_num<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl PickerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            page_size: env_num::<usize>("LAKESCOPE_PAGE_SIZE").unwrap_or(d.page_size).max(1),
            scroll_threshold_px: env_num("LAKESCOPE_SCROLL_THRESHOLD_PX").unwrap_or(d.scroll_threshold_px),
            column_height: env_num("LAKESCOPE_COLUMN_HEIGHT").unwrap_or(d.column_height),
            column_count: env_num("LAKESCOPE_COLUMN_COUNT").unwrap_or(d.column_count),
        }
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }
}
