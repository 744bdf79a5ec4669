// 🏭 Company Entity - a potential supplier
// Row of Virksomheder(virksomhed_id, navn, lokation, website, egnethed_forsvar)
//
// Only the identifier is guaranteed. A company without a name still takes
// part in individual matching but is left out of combination search.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a company (`virksomhed_id`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub i64);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CompanyId {
    fn from(id: i64) -> Self {
        CompanyId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,

    /// `navn` - may be NULL in the source data
    pub name: Option<String>,

    /// `lokation`
    pub location: Option<String>,

    /// `website`
    pub website: Option<String>,

    /// `egnethed_forsvar` - free-text suitability assessment
    pub suitability: Option<String>,
}

impl Company {
    pub fn new(id: impl Into<CompanyId>, name: impl Into<String>) -> Self {
        Company {
            id: id.into(),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Name for display; nameless companies fall back to their identifier
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.id),
        }
    }
}

/// Company plus the names of the capabilities it owns, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub company: Company,
    pub capabilities: Vec<String>,
}

impl CompanyProfile {
    /// Markdown-ish block mirroring the report's company card
    pub fn render(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        let mut out = String::new();
        out.push_str(&format!("### {}\n", self.company.display_name()));
        out.push_str(&format!("- Lokation: {}\n", field(&self.company.location)));
        out.push_str(&format!("- Website: {}\n", field(&self.company.website)));
        out.push_str(&format!("- Egnethed: {}\n", field(&self.company.suitability)));
        out.push_str("Kapabiliteter:\n");
        for name in &self.capabilities {
            out.push_str(&format!("- {}\n", name));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_id() {
        let named = Company::new(4, "Acme");
        let nameless = Company {
            id: CompanyId(9),
            ..Default::default()
        };

        assert_eq!(named.display_name(), "Acme");
        assert_eq!(nameless.display_name(), "#9");
    }

    #[test]
    fn test_profile_render_lists_capabilities() {
        let profile = CompanyProfile {
            company: Company {
                id: CompanyId(1),
                name: Some("Acme".to_string()),
                location: Some("Aarhus".to_string()),
                website: None,
                suitability: Some("Høj".to_string()),
            },
            capabilities: vec!["Fræsning".to_string(), "Svejsning".to_string()],
        };

        let text = profile.render();

        assert!(text.starts_with("### Acme\n"));
        assert!(text.contains("- Lokation: Aarhus"));
        assert!(text.contains("- Website: -"));
        assert!(text.contains("- Fræsning\n- Svejsning\n"));
    }
}
