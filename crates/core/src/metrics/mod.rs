//! sysinfo-backed counter sources.

pub mod cpu;
pub mod memory;
pub mod network;
pub mod process;
pub mod system;

pub use cpu::CpuCollector;
pub use memory::MemoryCollector;
pub use network::SysinfoNetworks;
pub use process::ProcessCollector;
pub use system::SysinfoSystem;
