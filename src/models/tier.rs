use std::collections::HashMap;

/// Internal product tier resolved from the provider's raw product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub id: String,
    pub name: String,
}

/// Pure product-id -> tier lookup consumed by the reconciler. No I/O, no
/// caching: unresolvable ids are passed through raw by the caller.
#[derive(Debug, Clone, Default)]
pub struct TierCatalog {
    by_product: HashMap<String, Tier>,
}

impl TierCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog entries: (provider product id, tier id, display name).
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: Into<String>,
    {
        let by_product = entries
            .into_iter()
            .map(|(product, id, name)| {
                (
                    product.into(),
                    Tier {
                        id: id.into(),
                        name: name.into(),
                    },
                )
            })
            .collect();
        Self { by_product }
    }

    /// Catalog of the provider product ids currently sold, mapped to the
    /// internal tiers they grant.
    pub fn builtin() -> Self {
        Self::with_entries([
            ("prod_basic_monthly", "basic", "Basic"),
            ("prod_basic_yearly", "basic", "Basic"),
            ("prod_pro_monthly", "pro", "Pro"),
            ("prod_pro_yearly", "pro", "Pro"),
            ("prod_studio_monthly", "studio", "Studio"),
            ("prod_studio_yearly", "studio", "Studio"),
        ])
    }

    pub fn resolve(&self, product_id: &str) -> Option<&Tier> {
        self.by_product.get(product_id)
    }

    /// Tier id when resolvable, otherwise the raw provider id.
    pub fn resolve_or_raw(&self, product_id: &str) -> String {
        self.resolve(product_id)
            .map(|t| t.id.clone())
            .unwrap_or_else(|| product_id.to_string())
    }
}
