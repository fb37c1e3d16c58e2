use std::str::FromStr;

use crate::model::{CategoryId, DataWeight, Difficulty, Resource};

/// Sentinel accepted by the catalog selects to mean "no constraint".
pub const ALL_SENTINEL: &str = "all";

/// One filter dimension: either unconstrained or an exact value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Choice<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Choice<T> {
    #[must_use]
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(expected) => expected == value,
        }
    }
}

impl<T: FromStr> FromStr for Choice<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_SENTINEL {
            return Ok(Choice::All);
        }
        s.parse().map(Choice::Only)
    }
}

/// Difficulty, data weight and language filter of the catalog pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub difficulty: Choice<Difficulty>,
    pub data_weight: Choice<DataWeight>,
    pub language: Choice<String>,
}

impl CatalogFilter {
    #[must_use]
    pub fn matches(&self, resource: &Resource) -> bool {
        self.difficulty.accepts(&resource.difficulty())
            && self.data_weight.accepts(&resource.data_weight())
            && match &self.language {
                Choice::All => true,
                Choice::Only(language) => language == resource.language(),
            }
    }
}

/// Resources passing every dimension of `filter`, in input order.
#[must_use]
pub fn filter_resources<'a>(resources: &'a [Resource], filter: &CatalogFilter) -> Vec<&'a Resource> {
    resources.iter().filter(|r| filter.matches(r)).collect()
}

/// Resources of one category passing `filter`, as on a category page.
#[must_use]
pub fn resources_in_category<'a>(
    resources: &'a [Resource],
    category_id: CategoryId,
    filter: &CatalogFilter,
) -> Vec<&'a Resource> {
    resources
        .iter()
        .filter(|r| r.category_id() == category_id && filter.matches(r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceDraft, ResourceId};

    fn resource(
        id: &str,
        difficulty: Difficulty,
        weight: DataWeight,
        language: &str,
        category: u32,
    ) -> Resource {
        Resource::from_persisted(
            ResourceId::new(id),
            ResourceDraft {
                title: format!("Resource {id}"),
                url: format!("https://example.org/{id}"),
                description: None,
                language: language.into(),
                data_weight: weight,
                difficulty,
                category_id: CategoryId::new(category),
                author: None,
            },
        )
    }

    fn catalog() -> Vec<Resource> {
        vec![
            resource("a", Difficulty::Advanced, DataWeight::Flux, "Anglais", 1),
            resource("b", Difficulty::Beginner, DataWeight::Plume, "Français", 1),
            resource("c", Difficulty::Advanced, DataWeight::Plume, "Français", 2),
            resource("d", Difficulty::Intermediate, DataWeight::Media, "Anglais", 2),
        ]
    }

    fn ids(resources: &[&Resource]) -> Vec<String> {
        resources.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn single_dimension_ignores_the_others() {
        let resources = catalog();
        let filter = CatalogFilter {
            difficulty: "Avancé".parse().unwrap(),
            data_weight: "all".parse().unwrap(),
            language: "all".parse().unwrap(),
        };
        assert_eq!(ids(&filter_resources(&resources, &filter)), vec!["a", "c"]);
    }

    #[test]
    fn dimensions_combine_conjunctively() {
        let resources = catalog();
        let filter = CatalogFilter {
            difficulty: Choice::Only(Difficulty::Advanced),
            data_weight: Choice::Only(DataWeight::Plume),
            language: Choice::Only("Français".into()),
        };
        assert_eq!(ids(&filter_resources(&resources, &filter)), vec!["c"]);
    }

    #[test]
    fn default_filter_keeps_everything() {
        let resources = catalog();
        assert_eq!(filter_resources(&resources, &CatalogFilter::default()).len(), 4);
    }

    #[test]
    fn category_page_restricts_first() {
        let resources = catalog();
        let filter = CatalogFilter {
            language: Choice::Only("Anglais".into()),
            ..CatalogFilter::default()
        };
        assert_eq!(
            ids(&resources_in_category(&resources, CategoryId::new(2), &filter)),
            vec!["d"]
        );
    }

    #[test]
    fn unknown_labels_fail_to_parse() {
        assert!("Expert".parse::<Choice<Difficulty>>().is_err());
        assert_eq!(
            "Media".parse::<Choice<DataWeight>>().unwrap(),
            Choice::Only(DataWeight::Media)
        );
    }
}
