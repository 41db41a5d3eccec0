/// Sandbox policy: the four per-test-point limits in the units the kernel
/// limits are traditionally expressed in (seconds, KiB, 512-byte blocks, count)
use crate::config::manifest::TestPointDescriptor;
use nix::sys::resource::Resource;

pub const KIB: u64 = 1024;
pub const FILE_BLOCK_SIZE: u64 = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SandboxPolicy {
    /// CPU time, whole seconds
    pub cpu_seconds: u64,
    /// Address space, KiB
    pub memory_kib: u64,
    /// Largest file the child may write, 512-byte blocks
    pub file_size_blocks: u64,
    /// Open file descriptors
    pub open_files: u64,
}

/// One `setrlimit` call, precomputed so the pre-exec hook does no arithmetic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RlimitSetting {
    pub name: &'static str,
    pub resource: Resource,
    pub soft: u64,
    pub hard: u64,
}

impl SandboxPolicy {
    /// Translate a descriptor's limits. `disk_limit` is the effective (non-negative)
    /// value after any playground reset has been resolved. All divisions truncate.
    pub fn for_test_point(descriptor: &TestPointDescriptor, disk_limit: u64) -> Self {
        Self {
            cpu_seconds: descriptor.time_limit / 1000,
            memory_kib: descriptor.memory_limit / KIB,
            file_size_blocks: disk_limit / FILE_BLOCK_SIZE,
            open_files: descriptor.file_number_limit,
        }
    }

    pub fn memory_bytes(&self) -> u64 {
        self.memory_kib.saturating_mul(KIB)
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_blocks.saturating_mul(FILE_BLOCK_SIZE)
    }

    pub fn rlimits(&self) -> [RlimitSetting; 4] {
        // RLIMIT_CPU: soft raises SIGXCPU, hard one second later is SIGKILL.
        // The kernel rounds a zero CPU limit up to one second anyway.
        let cpu_soft = self.cpu_seconds.max(1);
        [
            RlimitSetting {
                name: "RLIMIT_CPU",
                resource: Resource::RLIMIT_CPU,
                soft: cpu_soft,
                hard: cpu_soft.saturating_add(1),
            },
            RlimitSetting {
                name: "RLIMIT_AS",
                resource: Resource::RLIMIT_AS,
                soft: self.memory_bytes(),
                hard: self.memory_bytes(),
            },
            RlimitSetting {
                name: "RLIMIT_FSIZE",
                resource: Resource::RLIMIT_FSIZE,
                soft: self.file_size_bytes(),
                hard: self.file_size_bytes(),
            },
            RlimitSetting {
                name: "RLIMIT_NOFILE",
                resource: Resource::RLIMIT_NOFILE,
                soft: self.open_files,
                hard: self.open_files,
            },
        ]
    }
}
