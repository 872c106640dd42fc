//! Fixed kernel identifiers, resolved once per driver into backend handles.

/// Every compute kernel a swarm can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    CrawlingInit,
    CrawlingUpdate,
    CrawlingReconstruct,
    FloatingInit,
    FloatingUpdate,
    FloatingReconstruct,
    SwirlingUpdate,
    SwirlingReconstruct,
}

impl Kernel {
    pub const ALL: [Kernel; 8] = [
        Kernel::CrawlingInit,
        Kernel::CrawlingUpdate,
        Kernel::CrawlingReconstruct,
        Kernel::FloatingInit,
        Kernel::FloatingUpdate,
        Kernel::FloatingReconstruct,
        Kernel::SwirlingUpdate,
        Kernel::SwirlingReconstruct,
    ];

    /// WGSL entry point name.
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::CrawlingInit => "CrawlingInit",
            Kernel::CrawlingUpdate => "CrawlingUpdate",
            Kernel::CrawlingReconstruct => "CrawlingReconstruct",
            Kernel::FloatingInit => "FloatingInit",
            Kernel::FloatingUpdate => "FloatingUpdate",
            Kernel::FloatingReconstruct => "FloatingReconstruct",
            Kernel::SwirlingUpdate => "SwirlingUpdate",
            Kernel::SwirlingReconstruct => "SwirlingReconstruct",
        }
    }

    /// Shader file stem the wgpu backend looks for, e.g. `crawling_update`.
    pub fn file_stem(self) -> &'static str {
        match self {
            Kernel::CrawlingInit => "crawling_init",
            Kernel::CrawlingUpdate => "crawling_update",
            Kernel::CrawlingReconstruct => "crawling_reconstruct",
            Kernel::FloatingInit => "floating_init",
            Kernel::FloatingUpdate => "floating_update",
            Kernel::FloatingReconstruct => "floating_reconstruct",
            Kernel::SwirlingUpdate => "swirling_update",
            Kernel::SwirlingReconstruct => "swirling_reconstruct",
        }
    }
}

/// Opaque backend-specific kernel handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub(crate) u32);

/// Kernels one variant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSet {
    /// Seeds the history; `None` for variants that rebuild it every tick.
    pub init: Option<Kernel>,
    pub update: Kernel,
    pub reconstruct: Kernel,
}

/// A [`KernelSet`] after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKernels {
    pub init: Option<KernelHandle>,
    pub update: KernelHandle,
    pub reconstruct: KernelHandle,
}
