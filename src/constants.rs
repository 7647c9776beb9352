pub(crate) const MANIFEST_CONTENT_TYPE: &str = "application/x-mpegURL";
pub(crate) const MANIFEST_SUFFIX: &str = ".m3u8";

pub(crate) const CORS_ALLOW_ORIGIN: &str = "*";
pub(crate) const CORS_ALLOW_HEADERS: &str = "Content-Type, Origin";
pub(crate) const CORS_ALLOW_METHODS: &str = "POST, GET, OPTIONS";
pub(crate) const CORS_MAX_AGE: &str = "86400";

pub(crate) const BASIC_CHALLENGE: &str = "Basic realm=\"Access to HLS streams\"";

/// Validity window for every signed URL minted by the gatekeeper.
pub(crate) const SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Upper bound on a single origin manifest fetch.
pub(crate) const UPSTREAM_TIMEOUT_SECS: u64 = 10;

pub(crate) const DEFAULT_ORIGIN: &str = "https://lab-signed.cdn.eyevinn.technology";
pub(crate) const DEFAULT_USERNAME: &str = "eyevinnpoc";
pub(crate) const DEFAULT_PASSWORD: &str = "eyevinnpoc";
