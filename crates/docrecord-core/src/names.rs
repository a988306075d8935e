use convert_case::{Case, Casing};

///
/// Naming conventions
///
/// Relation names, foreign keys, and identifier aliases all derive from the
/// model name by convention: `belongs_to("user")` owns `userId`, a `Profile`
/// answers the `profileId` alias, and `has_many("addresses")` targets the
/// `Address` model.
///

/// Singular form of a relation name. Three rules cover the conventional
/// plural shapes: `companies` → `company`, `addresses` → `address`,
/// `users` → `user`.
#[must_use]
pub fn singularize(plural: &str) -> String {
    if let Some(stem) = plural.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = plural.strip_suffix("es") {
        stem.to_string()
    } else if let Some(stem) = plural.strip_suffix('s') {
        stem.to_string()
    } else {
        plural.to_string()
    }
}

/// Conventional model name for a relation: PascalCase of the singular form.
#[must_use]
pub fn class_name(relation: &str) -> String {
    singularize(relation).to_case(Case::Pascal)
}

/// Foreign-key field for a relation base name: camelCase plus `Id`.
#[must_use]
pub fn foreign_key(base: &str) -> String {
    format!("{}Id", base.to_case(Case::Camel))
}

/// Sibling field recording the target model name of a polymorphic relation.
#[must_use]
pub fn model_field(base: &str) -> String {
    format!("{}Model", base.to_case(Case::Camel))
}

/// Identifier alias answered by a model in selectors: `Profile` → `profileId`.
#[must_use]
pub fn id_alias(model_name: &str) -> String {
    foreign_key(model_name)
}

/// Default collection name for a model: camelCase plural.
/// `User` → `users`, `Address` → `addresses`, `Company` → `companies`.
#[must_use]
pub fn collection_name(model_name: &str) -> String {
    let camel = model_name.to_case(Case::Camel);
    if let Some(stem) = camel.strip_suffix('y') {
        format!("{stem}ies")
    } else if camel.ends_with('s') || camel.ends_with('x') {
        format!("{camel}es")
    } else {
        format!("{camel}s")
    }
}
