use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Rancher,
    /// Any other role the server sends; an absent role is `Other("")`.
    Other(String),
}

impl Role {
    pub fn from_wire(role: Option<&str>) -> Self {
        match role.unwrap_or_default() {
            "administrador" => Role::Administrator,
            "ganadero" => Role::Rancher,
            other => Role::Other(other.to_string()),
        }
    }

    /// The permission table. Unlisted combinations are denied.
    pub fn allows(&self, permission: Permission) -> bool {
        let admin = *self == Role::Administrator;
        let rancher = *self == Role::Rancher;

        match permission {
            Permission::EditDiseaseStatus
            | Permission::EditVaccineStatus
            | Permission::EditCow
            | Permission::DeleteVaccinations
            | Permission::DeleteDiseases => admin,
            Permission::EditDiseases | Permission::EditVaccinations => admin || rancher,
            Permission::ViewAll => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    EditDiseaseStatus,
    EditVaccineStatus,
    EditCow,
    EditDiseases,
    DeleteVaccinations,
    DeleteDiseases,
    EditVaccinations,
    ViewAll,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::EditDiseaseStatus,
        Permission::EditVaccineStatus,
        Permission::EditCow,
        Permission::EditDiseases,
        Permission::DeleteVaccinations,
        Permission::DeleteDiseases,
        Permission::EditVaccinations,
        Permission::ViewAll,
    ];

    /// The name front ends and the server use for this permission.
    pub fn name(&self) -> &'static str {
        match self {
            Permission::EditDiseaseStatus => "edit_enfermedades_status",
            Permission::EditVaccineStatus => "edit_vacunas_status",
            Permission::EditCow => "edit_vaca",
            Permission::EditDiseases => "edit_enfermedades",
            Permission::DeleteVaccinations => "delete_vacunas",
            Permission::DeleteDiseases => "delete_enfermedades",
            Permission::EditVaccinations => "edit_vacunas",
            Permission::ViewAll => "view_all",
        }
    }
}

impl FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown permission: {}", s))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
