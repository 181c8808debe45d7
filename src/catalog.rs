//! Default catalog of plugins and applications for a fresh PDI.
//!
//! A CMDB / ITOM oriented starter set. Used whenever neither the command
//! line nor the configuration file names identifiers.

/// One well-known identifier with a description for `pdi-setup catalog`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Plugin id or application scope
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const DEFAULT_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "com.snc.itom.discovery.license",
        name: "ITOM Discovery License",
        description: "",
    },
    CatalogEntry {
        id: "sn_sgc_central",
        name: "SGC Central",
        description: "Unified console for managing Service Graph Connectors",
    },
    CatalogEntry {
        id: "sn_int_studio",
        name: "IntegrationHub ETL",
        description: "Extract, transform, load tool for data ingestion through IRE",
    },
    CatalogEntry {
        id: "sn_aws_integ",
        name: "Service Graph Connector for AWS",
        description: "Imports data from AWS into the CMDB",
    },
    CatalogEntry {
        id: "sn_itom_pattern",
        name: "Discovery and Service Mapping Patterns",
        description: "",
    },
    CatalogEntry {
        id: "sn_cmdb_ci_class",
        name: "CMDB CI Class Models",
        description: "Base-system CMDB CI class models",
    },
    CatalogEntry {
        id: "sn_ent",
        name: "Expanded Model and Asset Classes",
        description: "",
    },
    CatalogEntry {
        id: "sn_cmdb_foundation",
        name: "Data Foundation Model",
        description: "Foundational product engineering data model constructs",
    },
    CatalogEntry {
        id: "sn_cmdb_int_util",
        name: "Integration Commons for CMDB",
        description: "",
    },
    CatalogEntry {
        id: "sn_getwell",
        name: "CMDB and CSDM Data Foundations Dashboards",
        description: "",
    },
];

/// Catalog identifiers in catalog order
pub fn default_identifiers() -> Vec<String> {
    DEFAULT_CATALOG.iter().map(|e| e.id.to_string()).collect()
}
