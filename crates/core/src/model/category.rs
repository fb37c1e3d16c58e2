use crate::model::ids::CategoryId;

/// A top-level catalog section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: u32,
    pub name: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub icon_name: &'static str,
}

impl Category {
    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        CategoryId::new(self.id)
    }
}

/// The fixed category list shared by resources, paths and certifications.
pub const CATEGORIES: [Category; 6] = [
    Category {
        id: 1,
        name: "Développement Web",
        slug: "developpement-web",
        description: "Apprenez à créer des sites et applications web modernes.",
        icon_name: "BookOpen",
    },
    Category {
        id: 2,
        name: "Cybersécurité",
        slug: "cybersecurite",
        description: "Protégez les systèmes informatiques contre les menaces et les vulnérabilités.",
        icon_name: "Shield",
    },
    Category {
        id: 3,
        name: "Data Science & IA",
        slug: "data-science-ia",
        description: "Explorez le monde des données, de l'analyse à l'intelligence artificielle.",
        icon_name: "BrainCircuit",
    },
    Category {
        id: 4,
        name: "Réseau",
        slug: "reseau",
        description: "Comprenez les fondements des réseaux informatiques.",
        icon_name: "Network",
    },
    Category {
        id: 5,
        name: "Système",
        slug: "systeme",
        description: "Administrez et maintenez des systèmes d'exploitation.",
        icon_name: "Server",
    },
    Category {
        id: 6,
        name: "Cloud Computing",
        slug: "cloud-computing",
        description: "Déployez et gérez des applications sur des infrastructures cloud.",
        icon_name: "Cloud",
    },
];

#[must_use]
pub fn category_by_id(id: CategoryId) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id.value())
}

#[must_use]
pub fn category_by_slug(slug: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.slug == slug)
}
