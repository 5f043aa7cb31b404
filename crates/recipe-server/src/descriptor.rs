// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! What this service tells the schema gateway about itself.
//!
//! [`ServiceDescriptor`] goes out on `service.up`. [`ApiSurface`] lists the
//! root operations and exported types, each announced on its own
//! `register*` topic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bus::topics;

/// How the gateway resolves an extension field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRule {
    /// Gateway query that resolves the field.
    pub by: String,
    /// Query argument → source field of the extended type.
    pub field_arguments: BTreeMap<String, String>,
}

/// A field added to another service's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldType {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Resolution rule.
    pub resolve: ResolveRule,
}

/// Fields this service contributes to a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaExtension {
    /// Type being extended.
    #[serde(rename = "type")]
    pub target_type: String,
    /// Added fields, in declaration order.
    pub fields: Vec<FieldType>,
}

/// Endpoints and schema contributions of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// Service name.
    pub name: String,
    /// Hostname the gateway should call.
    pub hostname: String,
    /// Port the gateway should call.
    pub port: u16,
    /// Query endpoint path.
    pub query_endpoint: String,
    /// Streaming (subscription) endpoint path.
    pub stream_endpoint: String,
    /// Schema extensions, in declaration order.
    #[serde(default)]
    pub schema_extensions: Vec<SchemaExtension>,
}

impl ServiceDescriptor {
    /// Descriptor of the recipe service.
    ///
    /// Recipe line items only carry item identifiers; the gateway stitches in
    /// the `item` field by calling the catalog's `item(id)` query.
    pub fn recipe(name: impl Into<String>, hostname: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            port,
            query_endpoint: "/graphql".to_string(),
            stream_endpoint: "/socket".to_string(),
            schema_extensions: vec![
                item_extension("RecipeInput"),
                item_extension("RecipeOutput"),
            ],
        }
    }
}

fn item_extension(target_type: &str) -> SchemaExtension {
    SchemaExtension {
        target_type: target_type.to_string(),
        fields: vec![FieldType {
            name: "item".to_string(),
            field_type: "Item".to_string(),
            resolve: ResolveRule {
                by: "item".to_string(),
                field_arguments: BTreeMap::from([("id".to_string(), "itemId".to_string())]),
            },
        }],
    }
}

/// Root type an operation hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Read operation.
    Query,
    /// Write operation.
    Mutation,
    /// Streaming operation.
    Subscription,
}

impl OperationKind {
    /// Topic registrations of this kind are published on.
    pub fn topic(self) -> &'static str {
        match self {
            Self::Query => topics::REGISTER_QUERY,
            Self::Mutation => topics::REGISTER_MUTATION,
            Self::Subscription => topics::REGISTER_SUBSCRIPTION,
        }
    }
}

/// A named, typed slot: an operation argument or a type field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Name.
    pub name: String,
    /// Type in schema notation, e.g. `[Recipe!]!`.
    #[serde(rename = "type")]
    pub field_type: String,
}

/// A root operation exposed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Root type.
    pub kind: OperationKind,
    /// Field name on the root type.
    pub name: String,
    /// Result type.
    #[serde(rename = "type")]
    pub return_type: String,
    /// Arguments, in declaration order.
    pub arguments: Vec<Field>,
}

/// An object type the service owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Type name.
    pub name: String,
    /// Fields, in declaration order.
    pub fields: Vec<Field>,
}

/// Operations and types the gateway should route to this service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiSurface {
    /// Root operations.
    pub operations: Vec<Operation>,
    /// Exported types.
    pub types: Vec<TypeDefinition>,
}

impl ApiSurface {
    /// Operations and types of the recipe service.
    pub fn recipe() -> Self {
        use OperationKind::{Mutation, Query};

        let page_args = [
            ("first", "Int"),
            ("last", "Int"),
            ("before", "String"),
            ("after", "String"),
            ("namespaceId", "ID"),
            ("inputItem", "ID"),
            ("outputItem", "ID"),
        ];
        let line = [("itemId", "ID!"), ("amount", "Int!")];

        Self {
            operations: vec![
                operation(Query, "recipes", "RecipeConnection!", &page_args),
                operation(Query, "recipe", "Recipe!", &[("id", "ID!")]),
                operation(
                    Mutation,
                    "createRecipe",
                    "Recipe!",
                    &[("input", "RecipeMutationInput")],
                ),
                operation(
                    Mutation,
                    "updateRecipe",
                    "Recipe!",
                    &[("id", "ID!"), ("input", "RecipeMutationInput")],
                ),
                operation(Mutation, "deleteRecipe", "ID", &[("id", "ID!")]),
                operation(Mutation, "rcRecipeImport", "ID", &[]),
            ],
            types: vec![
                type_definition(
                    "Recipe",
                    &[
                        ("id", "ID!"),
                        ("namespaceId", "ID"),
                        ("inputs", "[RecipeInput!]!"),
                        ("outputs", "[RecipeOutput!]!"),
                        ("craftingLevel", "Int"),
                        ("craftingJobId", "ID"),
                        ("masterbook", "Int"),
                        ("requiredControl", "Int"),
                        ("requiredCraftsmanship", "Int"),
                        ("stars", "Int"),
                    ],
                ),
                type_definition("RecipeInput", &line),
                type_definition("RecipeOutput", &line),
                type_definition(
                    "RecipeConnection",
                    &[
                        ("total", "Int!"),
                        ("from", "String"),
                        ("to", "String"),
                        ("hasNextPage", "Boolean!"),
                        ("hasPreviousPage", "Boolean!"),
                        ("items", "[Recipe!]!"),
                    ],
                ),
            ],
        }
    }

    /// Operations of one kind.
    pub fn operations_of(&self, kind: OperationKind) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(move |op| op.kind == kind)
    }
}

fn fields(pairs: &[(&str, &str)]) -> Vec<Field> {
    pairs
        .iter()
        .map(|(name, field_type)| Field {
            name: name.to_string(),
            field_type: field_type.to_string(),
        })
        .collect()
}

fn operation(
    kind: OperationKind,
    name: &str,
    return_type: &str,
    arguments: &[(&str, &str)],
) -> Operation {
    Operation {
        kind,
        name: name.to_string(),
        return_type: return_type.to_string(),
        arguments: fields(arguments),
    }
}

fn type_definition(name: &str, pairs: &[(&str, &str)]) -> TypeDefinition {
    TypeDefinition {
        name: name.to_string(),
        fields: fields(pairs),
    }
}
