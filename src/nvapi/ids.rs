//! Catalog of NVAPI entry points
//!
//! The driver exports a single `nvapi_QueryInterface` symbol; every other
//! function is looked up through it by a 32-bit ID.

use std::fmt;

/// Numbered NVAPI entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionId {
    Initialize,
    Unload,
    GetInterfaceVersionString,
    EnumPhysicalGpus,
    GetGpuIdFromPhysicalGpu,
    GetFullName,
    GetBoardInfo,
    GetAllClockFrequencies,
    GetDynamicPstatesInfoEx,
    GetPstates20,
    SetPstates20,
    ClientPowerPoliciesGetInfo,
    ClientPowerPoliciesGetStatus,
    ClientPowerPoliciesSetStatus,
    GetVoltageDomainsStatus,
    GetThermalSettings,
    ClientThermalPoliciesGetInfo,
    ClientThermalPoliciesGetStatus,
    ClientThermalPoliciesSetStatus,
}

impl FunctionId {
    /// Every known entry point
    pub const ALL: [FunctionId; 19] = [
        Self::Initialize,
        Self::Unload,
        Self::GetInterfaceVersionString,
        Self::EnumPhysicalGpus,
        Self::GetGpuIdFromPhysicalGpu,
        Self::GetFullName,
        Self::GetBoardInfo,
        Self::GetAllClockFrequencies,
        Self::GetDynamicPstatesInfoEx,
        Self::GetPstates20,
        Self::SetPstates20,
        Self::ClientPowerPoliciesGetInfo,
        Self::ClientPowerPoliciesGetStatus,
        Self::ClientPowerPoliciesSetStatus,
        Self::GetVoltageDomainsStatus,
        Self::GetThermalSettings,
        Self::ClientThermalPoliciesGetInfo,
        Self::ClientThermalPoliciesGetStatus,
        Self::ClientThermalPoliciesSetStatus,
    ];

    /// Query-interface ID
    pub const fn id(self) -> u32 {
        match self {
            Self::Initialize => 0x0150_E828,
            Self::Unload => 0xD22B_DD7E,
            Self::GetInterfaceVersionString => 0x0105_3FA5,
            Self::EnumPhysicalGpus => 0xE5AC_921F,
            Self::GetGpuIdFromPhysicalGpu => 0x6533_EA3E,
            Self::GetFullName => 0xCEEE_8E9F,
            Self::GetBoardInfo => 0x22D5_4523,
            Self::GetAllClockFrequencies => 0xDCB6_16C3,
            Self::GetDynamicPstatesInfoEx => 0x60DE_D2ED,
            Self::GetPstates20 => 0x6FF8_1213,
            Self::SetPstates20 => 0x0F4D_AE6B,
            Self::ClientPowerPoliciesGetInfo => 0x3420_6D86,
            Self::ClientPowerPoliciesGetStatus => 0x7091_6171,
            Self::ClientPowerPoliciesSetStatus => 0xAD95_F5ED,
            Self::GetVoltageDomainsStatus => 0xC16C_7E2C,
            Self::GetThermalSettings => 0xE364_0A56,
            Self::ClientThermalPoliciesGetInfo => 0x0D25_8BB5,
            Self::ClientThermalPoliciesGetStatus => 0xE9C4_25A1,
            Self::ClientThermalPoliciesSetStatus => 0x34C0_B13D,
        }
    }

    /// Look up an entry point by its query-interface ID
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.id() == id)
    }

    /// Vendor name of the entry point
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "NvAPI_Initialize",
            Self::Unload => "NvAPI_Unload",
            Self::GetInterfaceVersionString => "NvAPI_GetInterfaceVersionString",
            Self::EnumPhysicalGpus => "NvAPI_EnumPhysicalGPUs",
            Self::GetGpuIdFromPhysicalGpu => "NvAPI_GetGPUIDfromPhysicalGPU",
            Self::GetFullName => "NvAPI_GPU_GetFullName",
            Self::GetBoardInfo => "NvAPI_GPU_GetBoardInfo",
            Self::GetAllClockFrequencies => "NvAPI_GPU_GetAllClockFrequencies",
            Self::GetDynamicPstatesInfoEx => "NvAPI_GPU_GetDynamicPstatesInfoEx",
            Self::GetPstates20 => "NvAPI_GPU_GetPstates20",
            Self::SetPstates20 => "NvAPI_GPU_SetPstates20",
            Self::ClientPowerPoliciesGetInfo => "NvAPI_GPU_ClientPowerPoliciesGetInfo",
            Self::ClientPowerPoliciesGetStatus => "NvAPI_GPU_ClientPowerPoliciesGetStatus",
            Self::ClientPowerPoliciesSetStatus => "NvAPI_GPU_ClientPowerPoliciesSetStatus",
            Self::GetVoltageDomainsStatus => "NvAPI_GPU_GetVoltageDomainsStatus",
            Self::GetThermalSettings => "NvAPI_GPU_GetThermalSettings",
            Self::ClientThermalPoliciesGetInfo => "NvAPI_GPU_ClientThermalPoliciesGetInfo",
            Self::ClientThermalPoliciesGetStatus => "NvAPI_GPU_ClientThermalPoliciesGetStatus",
            Self::ClientThermalPoliciesSetStatus => "NvAPI_GPU_ClientThermalPoliciesSetStatus",
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<u32> = FunctionId::ALL.iter().map(|f| f.id()).collect();
        assert_eq!(ids.len(), FunctionId::ALL.len());
    }

    #[test]
    fn test_from_id_round_trips_catalog() {
        for function in FunctionId::ALL {
            assert_eq!(FunctionId::from_id(function.id()), Some(function));
        }
        assert_eq!(FunctionId::from_id(0xDEAD_BEEF), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FunctionId::Initialize.to_string(),
            "NvAPI_Initialize (0x0150E828)"
        );
    }
}
