//! Object-storage cache tuning.
//!
//! The settings arrive as human-readable size strings (`"10m"`, `"5 kb"`,
//! `"100"`) and are turned into an immutable [`CacheSizeConfig`] before any
//! repository I/O happens.

pub const KB: i64 = 1024;
pub const MB: i64 = 1024 * KB;

/// Raw cache settings as they appear in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSettings {
    pub packed_git_open_files: Option<String>,
    pub packed_git_limit: Option<String>,
    pub packed_git_window_size: Option<String>,
    pub packed_git_mmap: Option<String>,
    pub delta_base_cache_limit: Option<String>,
    pub stream_file_threshold: Option<String>,
}

/// Cache limits handed to the backend once, before the repository is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSizeConfig {
    pub packed_git_open_files: i32,
    pub packed_git_limit: i64,
    pub packed_git_window_size: i32,
    pub packed_git_mmap: bool,
    pub delta_base_cache_limit: i32,
    pub stream_file_threshold: i32,
}

impl Default for CacheSizeConfig {
    fn default() -> Self {
        Self {
            packed_git_open_files: 128,
            packed_git_limit: 10 * MB,
            packed_git_window_size: (8 * KB) as i32,
            packed_git_mmap: false,
            delta_base_cache_limit: (10 * MB) as i32,
            stream_file_threshold: (50 * MB) as i32,
        }
    }
}

impl CacheSizeConfig {
    /// Resolve raw settings against the defaults. `max_memory` bounds the
    /// stream file threshold, see [`clamp_stream_file_threshold`].
    pub fn from_settings(settings: &CacheSettings, max_memory: u64) -> Self {
        let defaults = Self::default();
        let threshold = parse_size(
            settings.stream_file_threshold.as_deref(),
            i64::from(defaults.stream_file_threshold),
        );

        Self {
            packed_git_open_files: saturate_i32(parse_size(
                settings.packed_git_open_files.as_deref(),
                i64::from(defaults.packed_git_open_files),
            )),
            packed_git_limit: parse_size(
                settings.packed_git_limit.as_deref(),
                defaults.packed_git_limit,
            ),
            packed_git_window_size: saturate_i32(parse_size(
                settings.packed_git_window_size.as_deref(),
                i64::from(defaults.packed_git_window_size),
            )),
            packed_git_mmap: settings
                .packed_git_mmap
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            delta_base_cache_limit: saturate_i32(parse_size(
                settings.delta_base_cache_limit.as_deref(),
                i64::from(defaults.delta_base_cache_limit),
            )),
            stream_file_threshold: clamp_stream_file_threshold(threshold, max_memory),
        }
    }
}

/// Parse `<integer>[spaces]<unit>` where unit is one of `""`, `k`, `kb`,
/// `m`, `mb` (any case). Anything else, including overflow, yields `default`.
pub fn parse_size(value: Option<&str>, default: i64) -> i64 {
    let Some(value) = value else {
        return default;
    };
    let value = value.trim();

    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    if digits_end == 0 {
        return default;
    }
    let (digits, rest) = value.split_at(digits_end);

    let factor = match rest.trim_start_matches(' ').to_ascii_lowercase().as_str() {
        "" => 1,
        "k" | "kb" => KB,
        "m" | "mb" => MB,
        _ => return default,
    };

    digits
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(factor))
        .unwrap_or(default)
}

/// Bound the stream file threshold by a quarter of the available memory and
/// by the largest length a 32-bit signed field can address.
pub fn clamp_stream_file_threshold(requested: i64, max_memory: u64) -> i32 {
    let quarter = i64::try_from(max_memory / 4).unwrap_or(i64::MAX);
    saturate_i32(requested.min(quarter))
}

fn saturate_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Memory this process may use: physical memory, further bounded by the
/// address-space rlimit. `u64::MAX` when neither can be determined.
#[cfg(unix)]
pub fn max_available_memory() -> u64 {
    // SAFETY: sysconf only reads system configuration values.
    let (pages, page_size) = unsafe {
        (
            libc::sysconf(libc::_SC_PHYS_PAGES),
            libc::sysconf(libc::_SC_PAGESIZE),
        )
    };
    let physical = if pages > 0 && page_size > 0 {
        (pages as u64).saturating_mul(page_size as u64)
    } else {
        u64::MAX
    };

    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, writable rlimit for the duration of the call.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_AS, &mut limit) };
    let address_space = if rc == 0 && limit.rlim_cur != libc::RLIM_INFINITY {
        limit.rlim_cur as u64
    } else {
        u64::MAX
    };

    physical.min(address_space)
}

#[cfg(not(unix))]
pub fn max_available_memory() -> u64 {
    u64::MAX
}
