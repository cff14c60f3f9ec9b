// gpu/device.rs — wgpu device selection and ownership.
//
// Responsibilities:
//   - Enumerate adapters and select one according to an explicit,
//     caller-overridable `AdapterPreference`.
//   - Own the wgpu instance/device/queue for the lifetime of a compute
//     context, and expose the device limits that the context validates
//     buffer sizes and workgroup widths against.
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` uses power-preference heuristics that can
// grab a software rasterizer (llvmpipe) when it happens to enumerate first.
// We enumerate explicitly and pick by tier:
//   1. DiscreteGpu / IntegratedGpu  - real hardware
//   2. VirtualGpu / Other           - VM pass-through, translation layers
//   3. Cpu                          - software rasterizer, last resort
// The tie-break within a tier is "first enumerated". Callers that need a
// specific adapter can ask for it by name, or reject software adapters
// outright with `AdapterPreference::HardwareOnly`.

use std::fmt;

/// Which adapter a `GpuDevice` should bind to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdapterPreference {
    /// Tiered selection: hardware first, software rasterizer as a last
    /// resort. Never fails as long as any adapter exists.
    #[default]
    Auto,
    /// Like `Auto`, but errors with `NoHardwareAdapter` instead of falling
    /// back to a CPU/software adapter.
    HardwareOnly,
    /// First adapter whose name contains the given string
    /// (case-insensitive). Errors with `AdapterNotFound` on no match.
    Named(String),
}

/// Cached adapter information for logging and error messages.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.name, self.backend, self.device_type
        )
    }
}

/// The core GPU handle: adapter, device, queue.
///
/// Create via [`GpuDevice::new`] or [`GpuDevice::with_preference`]. One
/// `GpuDevice` lives exactly as long as the `ComputeContext` that owns it;
/// it is not safe for concurrent use from multiple threads.
///
/// # Field drop order
/// Rust drops struct fields in declaration order. `_instance` is declared
/// last so the `wgpu::Instance` outlives `device` and `queue`; device-level
/// objects hold back-references into the instance on some drivers.
#[derive(Debug)]
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    /// Limits actually granted by the device. Buffer sizes and workgroup
    /// widths are validated against these before any allocation.
    pub limits: wgpu::Limits,
    /// Keeps the `wgpu::Instance` alive until `device` and `queue` are
    /// dropped. Never accessed directly.
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Select an adapter with [`AdapterPreference::Auto`] and request a
    /// device from it.
    ///
    /// # Errors
    /// Returns `Err` if no adapter is found or the device request fails.
    pub fn new() -> Result<Self, GpuError> {
        Self::with_preference(AdapterPreference::Auto)
    }

    /// Select an adapter with an explicit preference.
    pub fn with_preference(pref: AdapterPreference) -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async(pref))
    }

    async fn init_async(pref: AdapterPreference) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::PRIMARY)
            .into_iter()
            .collect();

        let candidates: Vec<(String, wgpu::DeviceType)> = adapters
            .iter()
            .map(|a| {
                let info = a.get_info();
                (info.name, info.device_type)
            })
            .collect();
        let selected = pick_adapter(&candidates, &pref)?;
        let adapter = &adapters[selected];

        let raw_info = adapter.get_info();
        eprintln!(
            "[eigenlens] adapter: {} ({:?}, {:?})",
            raw_info.name, raw_info.backend, raw_info.device_type
        );
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device: raw_info.device,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("eigenlens"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(GpuError::DeviceRequest)?;

        let limits = device.limits();

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            limits,
            _instance: instance,
        })
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GpuDevice {{ adapter: {} }}", self.adapter_info)
    }
}

// ============================================================
// Selection policy
// ============================================================

/// Selection tier for one adapter: lower is better.
fn tier(device_type: wgpu::DeviceType) -> u8 {
    match device_type {
        wgpu::DeviceType::DiscreteGpu | wgpu::DeviceType::IntegratedGpu => 0,
        wgpu::DeviceType::VirtualGpu | wgpu::DeviceType::Other => 1,
        wgpu::DeviceType::Cpu => 2,
    }
}

/// Pick an adapter index from `(name, device_type)` candidates according to
/// the preference. Pure so the policy table is testable without a GPU.
fn pick_adapter(
    candidates: &[(String, wgpu::DeviceType)],
    pref: &AdapterPreference,
) -> Result<usize, GpuError> {
    if candidates.is_empty() {
        return Err(GpuError::NoSuitableAdapter);
    }

    match pref {
        AdapterPreference::Auto => Ok(best_by_tier(candidates)),
        AdapterPreference::HardwareOnly => {
            let best = best_by_tier(candidates);
            if tier(candidates[best].1) == 2 {
                Err(GpuError::NoHardwareAdapter)
            } else {
                Ok(best)
            }
        }
        AdapterPreference::Named(wanted) => {
            let wanted_lower = wanted.to_ascii_lowercase();
            candidates
                .iter()
                .position(|(name, _)| name.to_ascii_lowercase().contains(&wanted_lower))
                .ok_or_else(|| GpuError::AdapterNotFound(wanted.clone()))
        }
    }
}

/// Index of the first candidate in the best occupied tier.
fn best_by_tier(candidates: &[(String, wgpu::DeviceType)]) -> usize {
    let mut best = 0;
    for (i, &(_, dt)) in candidates.iter().enumerate() {
        if tier(dt) < tier(candidates[best].1) {
            best = i;
        }
    }
    best
}

// ============================================================
// Reports for the `devices` binary
// ============================================================

/// One adapter's identity and the limits it reports. Produced by
/// [`enumerate`]; consumed by the `devices` listing tool.
pub struct AdapterReport {
    pub info: AdapterInfo,
    pub limits: wgpu::Limits,
}

/// Enumerate every visible adapter without binding a device to any of them.
pub fn enumerate() -> Vec<AdapterReport> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    instance
        .enumerate_adapters(wgpu::Backends::PRIMARY)
        .into_iter()
        .map(|adapter| {
            let info = adapter.get_info();
            AdapterReport {
                info: AdapterInfo {
                    name: info.name,
                    vendor: info.vendor,
                    device: info.device,
                    device_type: info.device_type,
                    backend: info.backend,
                },
                limits: adapter.limits(),
            }
        })
        .collect()
}

// ============================================================
// Error type
// ============================================================

/// Errors from adapter selection and device initialization.
#[derive(Debug)]
pub enum GpuError {
    /// No adapter visible at all. Check that a Vulkan/Metal/DX12 driver is
    /// installed and that the `devices` tool lists something.
    NoSuitableAdapter,
    /// `HardwareOnly` was requested but only CPU/software adapters exist.
    NoHardwareAdapter,
    /// `Named` matched no adapter; the payload is the requested name.
    AdapterNotFound(String),
    /// wgpu device request failed (driver issue, unsupported limits).
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoSuitableAdapter => {
                write!(f, "no graphics adapter found")
            }
            GpuError::NoHardwareAdapter => write!(
                f,
                "only CPU/software adapters found and HardwareOnly was requested"
            ),
            GpuError::AdapterNotFound(name) => {
                write!(f, "no adapter matching {name:?}")
            }
            GpuError::DeviceRequest(e) => write!(f, "device request failed: {e}"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceRequest(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::DeviceType;

    fn cands(list: &[(&str, DeviceType)]) -> Vec<(String, DeviceType)> {
        list.iter().map(|(n, t)| (n.to_string(), *t)).collect()
    }

    #[test]
    fn test_auto_prefers_hardware_over_software() {
        let c = cands(&[
            ("llvmpipe", DeviceType::Cpu),
            ("NVIDIA RTX 3060", DeviceType::DiscreteGpu),
        ]);
        assert_eq!(pick_adapter(&c, &AdapterPreference::Auto).unwrap(), 1);
    }

    #[test]
    fn test_auto_prefers_virtual_over_cpu() {
        let c = cands(&[
            ("llvmpipe", DeviceType::Cpu),
            ("dzn pass-through", DeviceType::Other),
        ]);
        assert_eq!(pick_adapter(&c, &AdapterPreference::Auto).unwrap(), 1);
    }

    #[test]
    fn test_auto_falls_back_to_cpu() {
        let c = cands(&[("llvmpipe", DeviceType::Cpu)]);
        assert_eq!(pick_adapter(&c, &AdapterPreference::Auto).unwrap(), 0);
    }

    #[test]
    fn test_auto_first_within_tier() {
        // Two hardware adapters: first enumerated wins.
        let c = cands(&[
            ("Intel UHD", DeviceType::IntegratedGpu),
            ("NVIDIA RTX 3060", DeviceType::DiscreteGpu),
        ]);
        assert_eq!(pick_adapter(&c, &AdapterPreference::Auto).unwrap(), 0);
    }

    #[test]
    fn test_hardware_only_rejects_cpu() {
        let c = cands(&[("llvmpipe", DeviceType::Cpu)]);
        let err = pick_adapter(&c, &AdapterPreference::HardwareOnly).unwrap_err();
        assert!(matches!(err, GpuError::NoHardwareAdapter));
    }

    #[test]
    fn test_named_match_is_case_insensitive() {
        let c = cands(&[
            ("llvmpipe", DeviceType::Cpu),
            ("NVIDIA RTX 3060", DeviceType::DiscreteGpu),
        ]);
        let pref = AdapterPreference::Named("nvidia".to_string());
        assert_eq!(pick_adapter(&c, &pref).unwrap(), 1);
    }

    #[test]
    fn test_named_no_match() {
        let c = cands(&[("llvmpipe", DeviceType::Cpu)]);
        let pref = AdapterPreference::Named("radeon".to_string());
        let err = pick_adapter(&c, &pref).unwrap_err();
        assert!(matches!(err, GpuError::AdapterNotFound(n) if n == "radeon"));
    }

    #[test]
    fn test_empty_candidate_list() {
        let err = pick_adapter(&[], &AdapterPreference::Auto).unwrap_err();
        assert!(matches!(err, GpuError::NoSuitableAdapter));
    }

    // Device initialization needs real drivers; kept out of the default run.

    #[test]
    #[ignore = "requires a GPU"]
    fn test_device_init_auto() {
        let gpu = GpuDevice::new().expect("should initialise a device");
        eprintln!("[test] {gpu}");
        assert!(gpu.limits.max_storage_buffer_binding_size > 0);
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_enumerate_reports_something() {
        let reports = enumerate();
        assert!(!reports.is_empty(), "no adapters visible");
        for r in &reports {
            eprintln!("[test] {} max_buffer={}", r.info, r.limits.max_buffer_size);
        }
    }
}
