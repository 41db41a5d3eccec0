/// Pre-exec hook for the program under test
///
/// Runs in the forked child between `fork` and `exec`, so it must stay
/// async-signal-safe: no allocation or logging. Errors surface to
/// the parent as a failed `spawn`.
use crate::exec::policy::RlimitSetting;
use nix::sys::resource::setrlimit;

fn apply_rlimit_value(setting: &RlimitSetting) -> std::io::Result<()> {
    setrlimit(setting.resource, setting.soft, setting.hard).map_err(std::io::Error::from)
}

/// Apply every limit in order, stopping at the first failure
pub fn apply_rlimits(settings: &[RlimitSetting]) -> std::io::Result<()> {
    for setting in settings {
        apply_rlimit_value(setting)?;
    }
    Ok(())
}
