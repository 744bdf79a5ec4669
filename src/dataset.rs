// 🗂️ Dataset - the five relations held in memory for one session
// Built once by the loader, read-only afterwards.
//
// Referential integrity is checked here, at construction time: every join
// row must resolve in its owning table, primary ids must be unique.

use crate::entities::{
    Capability, CapabilityId, Company, CompanyId, CompanyProfile, Product, ProductId,
};
use crate::error::{LoadError, LoadResult};
use crate::matcher::CapabilityIndex;
use std::collections::{BTreeMap, BTreeSet};

pub const CAPABILITIES: &str = "Produktionskapabiliteter";
pub const PRODUCTS: &str = "Produktbeskrivelser";
pub const PRODUCT_CAPABILITIES: &str = "ProduktKapabilitet";
pub const COMPANIES: &str = "Virksomheder";
pub const COMPANY_CAPABILITIES: &str = "VirksomhedKapabilitet";

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Table order is kept: requirement lists are shown in this order
    capabilities: Vec<Capability>,
    capability_pos: BTreeMap<CapabilityId, usize>,

    products: Vec<Product>,
    companies: BTreeMap<CompanyId, Company>,

    product_requirements: BTreeMap<ProductId, BTreeSet<CapabilityId>>,
    company_capabilities: BTreeMap<CompanyId, BTreeSet<CapabilityId>>,
}

/// Row counts, for logging and the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetStats {
    pub capabilities: usize,
    pub products: usize,
    pub companies: usize,
    pub product_links: usize,
    pub company_links: usize,
}

impl Dataset {
    /// Assemble and validate a dataset from raw rows
    pub fn from_parts(
        capabilities: Vec<Capability>,
        products: Vec<Product>,
        companies: Vec<Company>,
        product_links: Vec<(ProductId, CapabilityId)>,
        company_links: Vec<(CompanyId, CapabilityId)>,
    ) -> LoadResult<Self> {
        let mut capability_pos = BTreeMap::new();
        for (pos, cap) in capabilities.iter().enumerate() {
            if capability_pos.insert(cap.id, pos).is_some() {
                return Err(LoadError::DuplicateIdentifier {
                    relation: CAPABILITIES,
                    column: "kapabilitet_id",
                    id: cap.id.0,
                });
            }
        }

        let mut product_ids = BTreeSet::new();
        for product in &products {
            if !product_ids.insert(product.id) {
                return Err(LoadError::DuplicateIdentifier {
                    relation: PRODUCTS,
                    column: "produkt_id",
                    id: product.id.0,
                });
            }
        }

        let mut company_map = BTreeMap::new();
        for company in companies {
            let id = company.id;
            if company_map.insert(id, company).is_some() {
                return Err(LoadError::DuplicateIdentifier {
                    relation: COMPANIES,
                    column: "virksomhed_id",
                    id: id.0,
                });
            }
        }

        let mut product_requirements: BTreeMap<ProductId, BTreeSet<CapabilityId>> = BTreeMap::new();
        for (product_id, cap_id) in product_links {
            if !product_ids.contains(&product_id) {
                return Err(unresolved(PRODUCT_CAPABILITIES, "produkt_id", product_id.0, PRODUCTS));
            }
            if !capability_pos.contains_key(&cap_id) {
                return Err(unresolved(
                    PRODUCT_CAPABILITIES,
                    "kapabilitet_id",
                    cap_id.0,
                    CAPABILITIES,
                ));
            }
            product_requirements.entry(product_id).or_default().insert(cap_id);
        }

        let mut company_capabilities: BTreeMap<CompanyId, BTreeSet<CapabilityId>> = BTreeMap::new();
        for (company_id, cap_id) in company_links {
            if !company_map.contains_key(&company_id) {
                return Err(unresolved(
                    COMPANY_CAPABILITIES,
                    "virksomhed_id",
                    company_id.0,
                    COMPANIES,
                ));
            }
            if !capability_pos.contains_key(&cap_id) {
                return Err(unresolved(
                    COMPANY_CAPABILITIES,
                    "kapabilitet_id",
                    cap_id.0,
                    CAPABILITIES,
                ));
            }
            company_capabilities.entry(company_id).or_default().insert(cap_id);
        }

        Ok(Dataset {
            capabilities,
            capability_pos,
            products,
            companies: company_map,
            product_requirements,
            company_capabilities,
        })
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            capabilities: self.capabilities.len(),
            products: self.products.len(),
            companies: self.companies.len(),
            product_links: self.product_requirements.values().map(BTreeSet::len).sum(),
            company_links: self.company_capabilities.values().map(BTreeSet::len).sum(),
        }
    }

    // ========================================================================
    // CAPABILITIES
    // ========================================================================

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn capability(&self, id: CapabilityId) -> Option<&Capability> {
        self.capability_pos.get(&id).map(|&pos| &self.capabilities[pos])
    }

    /// Capabilities whose id is in `ids`, in table order
    fn capabilities_in(&self, ids: Option<&BTreeSet<CapabilityId>>) -> Vec<&Capability> {
        match ids {
            Some(ids) => self
                .capabilities
                .iter()
                .filter(|cap| ids.contains(&cap.id))
                .collect(),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // PRODUCTS
    // ========================================================================

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// First product with this name
    pub fn product_by_name(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// The product's requirement capabilities, in table order
    pub fn requirements_of(&self, product: ProductId) -> Vec<&Capability> {
        self.capabilities_in(self.product_requirements.get(&product))
    }

    pub fn requirement_ids(&self, product: ProductId) -> BTreeSet<CapabilityId> {
        self.product_requirements
            .get(&product)
            .cloned()
            .unwrap_or_default()
    }

    // ========================================================================
    // COMPANIES
    // ========================================================================

    pub fn companies(&self) -> impl Iterator<Item = &Company> {
        self.companies.values()
    }

    pub fn company(&self, id: CompanyId) -> Option<&Company> {
        self.companies.get(&id)
    }

    /// First company (lowest id) with this name
    pub fn company_by_name(&self, name: &str) -> Option<&Company> {
        self.companies
            .values()
            .find(|c| c.name.as_deref() == Some(name))
    }

    pub fn capabilities_of(&self, company: CompanyId) -> Vec<&Capability> {
        self.capabilities_in(self.company_capabilities.get(&company))
    }

    pub fn company_profile(&self, id: CompanyId) -> Option<CompanyProfile> {
        let company = self.company(id)?;
        Some(CompanyProfile {
            company: company.clone(),
            capabilities: self
                .capabilities_of(id)
                .into_iter()
                .map(|cap| cap.name.clone())
                .collect(),
        })
    }

    pub fn company_profile_by_name(&self, name: &str) -> Option<CompanyProfile> {
        self.company_by_name(name)
            .and_then(|company| self.company_profile(company.id))
    }

    /// Matcher input: every company, with its (possibly empty) capability set
    pub fn capability_index(&self) -> CapabilityIndex {
        let mut index = CapabilityIndex::new();
        for company in self.companies.values() {
            let caps = self
                .company_capabilities
                .get(&company.id)
                .into_iter()
                .flatten()
                .copied();
            index.insert(company.id, company.name.clone(), caps);
        }
        index
    }
}

fn unresolved(
    relation: &'static str,
    column: &'static str,
    id: i64,
    owner: &'static str,
) -> LoadError {
    LoadError::UnresolvedReference {
        relation,
        column,
        id,
        owner,
    }
}
