//! Randomized Chrome user agents.
//!
//! Every extraction attempt asks for a fresh identity, so retries of the same
//! URL present as different clients.

use rand::Rng;
use rand::seq::IndexedRandom;

/// Platform descriptors as they appear inside the parentheses of a UA string
pub const OS_DESCRIPTORS: &[&str] = &[
    "(Windows NT 10.0; Win64; x64)",
    "(Windows NT 6.1; Win64; x64)",
    "(Windows NT 10.0; WOW64)",
    "(Macintosh; Intel Mac OS X 10_15_7)",
    "(Macintosh; Intel Mac OS X 11_6_2)",
    "(X11; Linux x86_64)",
    "(X11; Ubuntu; Linux x86_64)",
    "(iPhone; CPU iPhone OS 16_5 like Mac OS X)",
    "(iPad; CPU OS 16_5 like Mac OS X)",
    "(Linux; Android 13; Pixel 7)",
    "(Linux; Android 12; SM-T870)",
    "(X11; CrOS x86_64 15359.58.0)",
];

/// WebKit engine versions used for both the `AppleWebKit/` and `Safari/` tokens
pub const ENGINE_VERSIONS: &[&str] = &["537.36", "605.1.15"];

/// Chrome major versions are drawn from this half-open range
pub const CHROME_MAJOR_RANGE: std::ops::Range<u32> = 90..100;

/// Generates a user agent with the thread-local RNG.
///
/// ```rust
/// let ua = siphon_core::user_agent::generate();
/// assert!(ua.starts_with("Mozilla/5.0 ("));
/// assert!(ua.contains("(KHTML, like Gecko) Chrome/"));
/// ```
pub fn generate() -> String {
    generate_with(&mut rand::rng())
}

/// Generates a user agent from the given RNG.
///
/// `Mozilla/5.0 <OS> AppleWebKit/<engine> (KHTML, like Gecko) Chrome/<major.minor.build.patch> Safari/<engine>`
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let os = OS_DESCRIPTORS.choose(rng).copied().unwrap_or(OS_DESCRIPTORS[0]);
    let engine = ENGINE_VERSIONS.choose(rng).copied().unwrap_or(ENGINE_VERSIONS[0]);
    let chrome = chrome_version(rng);

    format!("Mozilla/5.0 {os} AppleWebKit/{engine} (KHTML, like Gecko) Chrome/{chrome} Safari/{engine}")
}

fn chrome_version<R: Rng + ?Sized>(rng: &mut R) -> String {
    let major = rng.random_range(CHROME_MAJOR_RANGE);
    let minor = rng.random_range(0..10);
    let build = rng.random_range(1000..7000);
    let patch = rng.random_range(0..300);
    format!("{major}.{minor}.{build}.{patch}")
}
