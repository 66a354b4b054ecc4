//! 站点实现

pub mod mangafire;
