//! Startup banner.

use crate::consts::{AUTHOR, REPO};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub backend: &'a str,
    pub error_mode: &'a str,
    pub faults: &'a str,
    pub headers: usize,
}

pub fn render_banner(info: &BannerInfo) -> String {
    format!(
        r#"
   ┌───────────────────────────────┐
   │        Q U A R R Y            │
   │   type a name, get names      │
   └───────────────────────────────┘

   version   {}
   by        {}
   repo      {}
   backend   {}
   errors    {}
   faults    {}
   headers   {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        REPO,
        info.backend,
        info.error_mode,
        info.faults,
        info.headers,
    )
}

pub fn print_banner(info: &BannerInfo) {
    println!("{}", render_banner(info));
}
