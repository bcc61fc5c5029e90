pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# HARBORCTL CONFIGURATION
# =============================================================================
# This file configures the operational console for a fleet of sibling
# compose-based services. All fields are optional: CONTAINER_DIR/TZ
# environment variables take precedence over the matching file field.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/harborctl/config.yml
#   3. /etc/harborctl/config.yml

# Absolute path under which every service directory lives
# (<root>/<service>/{.env, docker-compose.yml, logs/}).
# Overridden by the CONTAINER_DIR environment variable; required one way
# or the other.
root: /srv/services

# IANA timezone used to interpret locale-form log timestamps.
# Overridden by the TZ environment variable. Defaults to UTC.
timezone: UTC

# Soft cap, in bytes, on a single time-range log read. Requests whose
# resolved byte range exceeds this are rejected with a hint to narrow
# the time range rather than buffering the whole thing.
soft_cap_bytes: 16777216

# Address the HTTP/WS API binds to.
listen: 127.0.0.1:8080

# Reserved: timestamp monotonicity is not validated on ingest. Leave false.
strict_monotonicity: false
"#
    .to_string()
}
