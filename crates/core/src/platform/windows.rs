//! Windows CPU tiers: PDH performance counters, then `GetSystemTimes` deltas.

use super::{busy_percent, CpuStrategy};
use crate::{
    error::{CoreError, Result},
    model::MonitoringMethod,
    source::SystemSource,
};
use std::thread;
use std::time::Duration;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::FILETIME;
use windows::Win32::System::Performance::{
    PdhAddEnglishCounterW, PdhCloseQuery, PdhCollectQueryData, PdhGetFormattedCounterValue,
    PdhOpenQueryW, PDH_FMT_COUNTERVALUE, PDH_FMT_DOUBLE,
};
use windows::Win32::System::Threading::GetSystemTimes;

fn pdh_check(status: u32, call: &str) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(CoreError::platform(format!("{} failed with status {:#010x}", call, status)))
    }
}

/// `\Processor(_Total)\% Processor Time`, collected twice across the window
pub struct PdhCounterStrategy {
    query: isize,
    counter: isize,
    window: Duration,
}

impl PdhCounterStrategy {
    pub fn open(window: Duration) -> Result<Self> {
        let mut query = 0isize;
        let mut counter = 0isize;

        // SAFETY: out-pointers reference live locals; the counter path is a static wide string
        unsafe {
            pdh_check(PdhOpenQueryW(PCWSTR::null(), 0, &mut query), "PdhOpenQueryW")?;

            let status = PdhAddEnglishCounterW(
                query,
                w!("\\Processor(_Total)\\% Processor Time"),
                0,
                &mut counter,
            );
            if let Err(e) = pdh_check(status, "PdhAddEnglishCounterW") {
                PdhCloseQuery(query);
                return Err(e);
            }

            if let Err(e) = pdh_check(PdhCollectQueryData(query), "PdhCollectQueryData") {
                PdhCloseQuery(query);
                return Err(e);
            }
        }

        Ok(Self {
            query,
            counter,
            window,
        })
    }
}

impl CpuStrategy for PdhCounterStrategy {
    fn method(&self) -> MonitoringMethod {
        MonitoringMethod::PlatformHighPrecisionCounter
    }

    fn name(&self) -> &'static str {
        "pdh"
    }

    fn measure(&mut self, _source: &mut dyn SystemSource) -> Result<f32> {
        // SAFETY: handles were produced by PdhOpenQueryW/PdhAddEnglishCounterW and live until drop
        unsafe {
            pdh_check(PdhCollectQueryData(self.query), "PdhCollectQueryData")?;
            thread::sleep(self.window);
            pdh_check(PdhCollectQueryData(self.query), "PdhCollectQueryData")?;

            let mut value = PDH_FMT_COUNTERVALUE::default();
            pdh_check(
                PdhGetFormattedCounterValue(self.counter, PDH_FMT_DOUBLE, None, &mut value),
                "PdhGetFormattedCounterValue",
            )?;

            Ok(value.Anonymous.doubleValue as f32)
        }
    }
}

impl Drop for PdhCounterStrategy {
    fn drop(&mut self) {
        // SAFETY: the query handle is closed exactly once
        unsafe {
            PdhCloseQuery(self.query);
        }
    }
}

fn filetime_ticks(ft: &FILETIME) -> u64 {
    ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64
}

/// `(idle, kernel, user)` in 100ns ticks
fn system_times() -> Result<(u64, u64, u64)> {
    let mut idle = FILETIME::default();
    let mut kernel = FILETIME::default();
    let mut user = FILETIME::default();

    // SAFETY: all three pointers reference live locals
    unsafe {
        GetSystemTimes(Some(&mut idle), Some(&mut kernel), Some(&mut user))
            .map_err(|e| CoreError::platform(format!("GetSystemTimes failed: {}", e)))?;
    }

    Ok((
        filetime_ticks(&idle),
        filetime_ticks(&kernel),
        filetime_ticks(&user),
    ))
}

/// Idle versus kernel+user time deltas; kernel time already includes idle
pub struct KernelTimeStrategy {
    window: Duration,
}

impl KernelTimeStrategy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl CpuStrategy for KernelTimeStrategy {
    fn method(&self) -> MonitoringMethod {
        MonitoringMethod::PlatformKernelTimeDelta
    }

    fn name(&self) -> &'static str {
        "kernel-time"
    }

    fn measure(&mut self, _source: &mut dyn SystemSource) -> Result<f32> {
        let (idle_start, kernel_start, user_start) = system_times()?;
        thread::sleep(self.window);
        let (idle_end, kernel_end, user_end) = system_times()?;

        let idle_delta = idle_end.saturating_sub(idle_start);
        let system_delta =
            kernel_end.saturating_sub(kernel_start) + user_end.saturating_sub(user_start);

        Ok(busy_percent(idle_delta, system_delta))
    }
}
