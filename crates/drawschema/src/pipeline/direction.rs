//! Relation direction and field resolution
//!
//! For every relation candidate the resolver decides which end is the
//! referencing ("many") side and which is the referenced side, then turns
//! both ends into concrete table/column pairs and checks them against the
//! schema snapshot.
//!
//! Direction is decided by an ordered list of [`DirectionRule`]s. The first
//! rule that does not answer [`RuleOutcome::Inconclusive`] wins.

use serde::Serialize;
use tracing::{debug, span, trace, Level};

use super::relation::{Endpoint, RelationCandidate};
use crate::core::{
    ref_type, singularize, Column, DiagnosticKind, Diagnostics, Entity, EntityArena, EntityRef,
    InferenceConfig, SchemaSnapshot,
};

/// Answer of one direction rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// `from` references `to`
    Decided { from: EntityRef, to: EntityRef },
    /// The rule does not apply, try the next one
    Inconclusive,
    /// The rule applies but cannot pick a side; stop here
    Ambiguous(String),
}

/// Everything a rule may look at for one candidate
pub struct RuleContext<'a> {
    pub candidate: &'a RelationCandidate,
    pub arena: &'a EntityArena,
    pub config: &'a InferenceConfig,
    pub source: EntityRef,
    pub target: EntityRef,
}

impl<'a> RuleContext<'a> {
    /// Schema identifier of the table an endpoint belongs to
    ///
    /// A class is its own table, an attribute belongs to its owning class.
    pub fn table_of(&self, entity: EntityRef) -> Option<&'a str> {
        match self.arena.entity(entity) {
            Entity::Class(class) => class.node.schema_id(),
            Entity::Attribute(attribute) => self
                .arena
                .owner_of(attribute)
                .and_then(|owner| owner.node.schema_id()),
            Entity::Other(node) => node.schema_id(),
        }
    }

    pub fn schema_id(&self, entity: EntityRef) -> Option<&'a str> {
        self.arena.node(entity).schema_id()
    }

    fn decided(&self, source_is_from: bool) -> RuleOutcome {
        if source_is_from {
            RuleOutcome::Decided {
                from: self.source,
                to: self.target,
            }
        } else {
            RuleOutcome::Decided {
                from: self.target,
                to: self.source,
            }
        }
    }
}

/// One named step of the direction decision chain
pub trait DirectionRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn decide(&self, context: &RuleContext<'_>) -> RuleOutcome;
}

/// The end drawn with the one-to-many marker is the referencing side,
/// provided the other end carries no arrow at all
#[derive(Debug, Default)]
pub struct ArrowRule;

impl DirectionRule for ArrowRule {
    fn name(&self) -> &'static str {
        "arrow"
    }

    fn decide(&self, context: &RuleContext<'_>) -> RuleOutcome {
        let marker = context.config.one_to_many_arrow.as_str();
        let source = &context.candidate.source;
        let target = &context.candidate.target;
        if source.has_arrow(marker) && target.arrow.is_none() {
            context.decided(true)
        } else if target.has_arrow(marker) && source.arrow.is_none() {
            context.decided(false)
        } else {
            RuleOutcome::Inconclusive
        }
    }
}

/// The end whose table is named by the connector's reference metadata is
/// the referenced side
#[derive(Debug, Default)]
pub struct ReferenceMetadataRule;

impl DirectionRule for ReferenceMetadataRule {
    fn name(&self) -> &'static str {
        "reference-metadata"
    }

    fn decide(&self, context: &RuleContext<'_>) -> RuleOutcome {
        let Some(reference) = &context.candidate.reference else {
            return RuleOutcome::Inconclusive;
        };
        let source_table = context.table_of(context.source);
        let target_table = context.table_of(context.target);
        let wanted = Some(reference.class.as_str());
        match (source_table == wanted, target_table == wanted) {
            (true, false) => context.decided(false),
            (false, true) => context.decided(true),
            _ => RuleOutcome::Ambiguous(format!(
                "reference to {}.{} matches {} of the connected tables",
                reference.class,
                reference.attribute,
                if source_table == wanted && target_table == wanted {
                    "both"
                } else {
                    "neither"
                }
            )),
        }
    }
}

/// Between two attributes of different classes, the one named by the
/// connector's reference-attribute field is the referenced side
#[derive(Debug, Default)]
pub struct AttributePairRule;

impl DirectionRule for AttributePairRule {
    fn name(&self) -> &'static str {
        "attribute-pair"
    }

    fn decide(&self, context: &RuleContext<'_>) -> RuleOutcome {
        let (EntityRef::Attribute(_), EntityRef::Attribute(_)) = (context.source, context.target)
        else {
            return RuleOutcome::Inconclusive;
        };
        let Some(ref_attribute) = context.candidate.ref_attribute.as_deref() else {
            return RuleOutcome::Inconclusive;
        };
        if context.table_of(context.source) == context.table_of(context.target) {
            return RuleOutcome::Inconclusive;
        }
        let source_matches = context.schema_id(context.source) == Some(ref_attribute);
        let target_matches = context.schema_id(context.target) == Some(ref_attribute);
        match (source_matches, target_matches) {
            (true, false) => context.decided(false),
            (false, true) => context.decided(true),
            _ => RuleOutcome::Inconclusive,
        }
    }
}

/// The rules in their fixed priority order
pub fn default_rules() -> Vec<Box<dyn DirectionRule>> {
    vec![
        Box::new(ArrowRule),
        Box::new(ReferenceMetadataRule),
        Box::new(AttributePairRule),
    ]
}

/// A foreign-key reference ready to be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRelation {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl ResolvedRelation {
    /// Column update turning `from_column` into a reference to `to_table`
    pub fn update(&self) -> Column {
        Column::type_update(&self.from_column, ref_type(&self.to_table))
    }
}

/// Table and column one endpoint stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAddress {
    pub table: String,
    pub column: String,
}

/// Decides relation direction and checks relations against a snapshot
pub struct DirectionResolver<'a> {
    config: &'a InferenceConfig,
    rules: Vec<Box<dyn DirectionRule>>,
}

impl<'a> DirectionResolver<'a> {
    pub fn new(config: &'a InferenceConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    pub fn with_rules(config: &'a InferenceConfig, rules: Vec<Box<dyn DirectionRule>>) -> Self {
        Self { config, rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Resolve every candidate, dropping and reporting the ones that fail
    pub fn resolve(
        &self,
        candidates: &[RelationCandidate],
        arena: &EntityArena,
        snapshot: &SchemaSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ResolvedRelation> {
        let direction_span = span!(Level::DEBUG, "resolve_relations", candidates = candidates.len());
        let _enter = direction_span.enter();

        let relations: Vec<ResolvedRelation> = candidates
            .iter()
            .filter_map(|candidate| self.resolve_one(candidate, arena, snapshot, diagnostics))
            .collect();
        debug!(resolved = relations.len(), "Relations resolved");
        relations
    }

    fn resolve_one(
        &self,
        candidate: &RelationCandidate,
        arena: &EntityArena,
        snapshot: &SchemaSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> Option<ResolvedRelation> {
        let (from, to) = self.direction(candidate, arena, diagnostics)?;
        let from = self.address(from, candidate, arena, diagnostics)?;
        let to = self.address(to, candidate, arena, diagnostics)?;

        if snapshot.column(&to.table, &to.column).is_none() {
            diagnostics.report(
                DiagnosticKind::TargetFieldMissing,
                format!("Field {} not found in table {}", to.column, to.table),
            );
            return None;
        }
        let link_type = ref_type(&to.table);
        let Some(existing) = snapshot.column(&from.table, &from.column) else {
            diagnostics.report(
                DiagnosticKind::TargetFieldMissing,
                format!("Field {} not found in table {}", from.column, from.table),
            );
            return None;
        };
        if existing.column_type() == Some(link_type.as_str()) {
            diagnostics.report(
                DiagnosticKind::RelationAlreadyApplied,
                format!(
                    "Table {} field {} already references table {}, nothing to change",
                    from.table, from.column, to.table
                ),
            );
            return None;
        }

        diagnostics.report(
            DiagnosticKind::PlannedChange,
            format!(
                "Adding relation: {} field {}  -->  {}",
                from.table, from.column, to.table
            ),
        );
        Some(ResolvedRelation {
            from_table: from.table,
            from_column: from.column,
            to_table: to.table,
            to_column: to.column,
        })
    }

    /// Run the endpoint checks and the rule chain
    pub fn direction(
        &self,
        candidate: &RelationCandidate,
        arena: &EntityArena,
        diagnostics: &mut Diagnostics,
    ) -> Option<(EntityRef, EntityRef)> {
        let describe = |endpoint: &Endpoint| -> String {
            match (endpoint.id.as_deref(), endpoint.entity) {
                (Some(id), Some(entity)) => {
                    format!("{} \"{}\"", id, arena.node(entity).display_label())
                }
                (Some(id), None) => id.to_string(),
                (None, _) => "<not connected>".to_string(),
            }
        };
        let sides = || {
            vec![
                format!("Source: {}", describe(&candidate.source)),
                format!("Target: {}", describe(&candidate.target)),
            ]
        };

        if candidate.source.id.is_none() || candidate.target.id.is_none() {
            diagnostics.report_with_details(
                DiagnosticKind::UnresolvableRelationEndpoint,
                "Connector is not attached to entities at both ends:",
                sides(),
            );
            return None;
        }
        let (Some(source), Some(target)) = (candidate.source.entity, candidate.target.entity)
        else {
            diagnostics.report_with_details(
                DiagnosticKind::DanglingRelationEndpoint,
                "Connector references an entity that does not exist:",
                sides(),
            );
            return None;
        };

        let context = RuleContext {
            candidate,
            arena,
            config: self.config,
            source,
            target,
        };
        let ambiguous = |reason: &str, diagnostics: &mut Diagnostics| {
            diagnostics.report_with_details(
                DiagnosticKind::AmbiguousRelationDirection,
                format!(
                    "Cannot determine relation direction: {}  --  {} ({})",
                    context.schema_id(source).unwrap_or("?"),
                    context.schema_id(target).unwrap_or("?"),
                    reason
                ),
                sides(),
            );
        };

        let source_table = context.table_of(source);
        if source == target || (source_table.is_some() && source_table == context.table_of(target))
        {
            ambiguous("both ends belong to the same table", diagnostics);
            return None;
        }

        for rule in &self.rules {
            match rule.decide(&context) {
                RuleOutcome::Decided { from, to } => {
                    trace!(rule = rule.name(), "Relation direction decided");
                    return Some((from, to));
                }
                RuleOutcome::Inconclusive => continue,
                RuleOutcome::Ambiguous(reason) => {
                    ambiguous(&reason, diagnostics);
                    return None;
                }
            }
        }
        ambiguous("no rule applies", diagnostics);
        None
    }

    /// Table and column an endpoint stands for
    pub fn address(
        &self,
        entity: EntityRef,
        candidate: &RelationCandidate,
        arena: &EntityArena,
        diagnostics: &mut Diagnostics,
    ) -> Option<FieldAddress> {
        let result = match arena.entity(entity) {
            Entity::Class(class) => match (class.node.schema_id(), candidate.ref_attribute.as_deref()) {
                (None, _) => Err(format!(
                    "Relation points at class \"{}\" which has no identifier",
                    class.node.display_label()
                )),
                (Some(table), None) => Err(format!(
                    "No field given for the relation, it points at table {} \"{}\" instead",
                    table,
                    class.node.display_label()
                )),
                (Some(table), Some(column)) => Ok(FieldAddress {
                    table: table.to_string(),
                    column: column.to_string(),
                }),
            },
            Entity::Attribute(attribute) => {
                let owner = arena.owner_of(attribute);
                match (owner.and_then(|o| o.node.schema_id()), attribute.node.schema_id()) {
                    (Some(table), Some(column)) => Ok(FieldAddress {
                        table: table.to_string(),
                        column: self.column_name(table, column),
                    }),
                    (None, _) => Err(format!(
                        "Relation points at attribute \"{}\" which has no identified owning class",
                        attribute.node.display_label()
                    )),
                    (_, None) => Err(format!(
                        "Relation points at attribute \"{}\" which has no identifier",
                        attribute.node.display_label()
                    )),
                }
            }
            Entity::Other(node) => Err(format!(
                "Relation points at \"{}\" which is neither a class nor an attribute",
                node.display_label()
            )),
        };
        match result {
            Ok(address) => Some(address),
            Err(message) => {
                diagnostics.report(DiagnosticKind::UnresolvableRelationEndpoint, message);
                None
            }
        }
    }

    /// Column id of an attribute, with the generic primary key renamed
    pub fn column_name(&self, table: &str, column: &str) -> String {
        primary_key_column(self.config, table, column)
    }
}

/// `<singular table>_ID` for the generic primary key, `column` otherwise
pub fn primary_key_column(config: &InferenceConfig, table: &str, column: &str) -> String {
    if column == config.primary_key_name {
        format!("{}_ID", singularize(table))
    } else {
        column.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeEntity, ClassEntity, DiagramNode, FieldReference, Table, ANY_TYPE};

    /// AUTHOR{ID, NAME} and BOOK{ID, AUTHOR}
    fn library() -> EntityArena {
        let attribute = |id: &str, en: &str| AttributeEntity::new(DiagramNode::new(id).with_en(en));
        let mut arena = EntityArena::new(
            vec![
                ClassEntity::new(DiagramNode::new("c_author").with_en("AUTHOR").with_label("Author")),
                ClassEntity::new(DiagramNode::new("c_book").with_en("BOOKS").with_label("Book")),
            ],
            vec![
                attribute("a_author_id", "ID"),
                attribute("a_name", "NAME"),
                attribute("a_book_id", "ID"),
                attribute("a_book_author", "AUTHOR"),
            ],
            vec![DiagramNode::new("note")],
        );
        assert!(arena.attach(0, "c_author"));
        assert!(arena.attach(1, "c_author"));
        assert!(arena.attach(2, "c_book"));
        assert!(arena.attach(3, "c_book"));
        arena
    }

    fn candidate(
        arena: &EntityArena,
        source: &str,
        source_arrow: Option<&str>,
        target: &str,
        target_arrow: Option<&str>,
    ) -> RelationCandidate {
        let endpoint = |id: &str, arrow: Option<&str>| Endpoint {
            id: Some(id.to_string()),
            arrow: arrow.map(str::to_string),
            entity: arena.lookup(id),
        };
        RelationCandidate {
            edge_id: Some("e1".to_string()),
            source: endpoint(source, source_arrow),
            target: endpoint(target, target_arrow),
            ref_attribute: None,
            reference: None,
        }
    }

    fn snapshot(book_author_type: &str) -> SchemaSnapshot {
        SchemaSnapshot::new()
            .with_table(
                Table::new("AUTHOR")
                    .with_column(Column::new("AUTHOR_ID", None, "Int"))
                    .with_column(Column::new("NAME", None, ANY_TYPE)),
            )
            .with_table(
                Table::new("BOOKS")
                    .with_column(Column::new("BOOK_ID", None, "Int"))
                    .with_column(Column::new("AUTHOR", None, book_author_type)),
            )
    }

    fn resolve(
        candidate: &RelationCandidate,
        arena: &EntityArena,
        snapshot: &SchemaSnapshot,
    ) -> (Vec<ResolvedRelation>, Diagnostics) {
        let config = InferenceConfig::default();
        let mut diagnostics = Diagnostics::new();
        let relations = DirectionResolver::new(&config).resolve(
            std::slice::from_ref(candidate),
            arena,
            snapshot,
            &mut diagnostics,
        );
        (relations, diagnostics)
    }

    #[test]
    fn test_rule_order() {
        let config = InferenceConfig::default();
        assert_eq!(
            DirectionResolver::new(&config).rule_names(),
            vec!["arrow", "reference-metadata", "attribute-pair"]
        );
    }

    #[test]
    fn test_arrow_rule_decides_and_renames_primary_key() {
        let arena = library();
        let candidate = candidate(&arena, "a_book_author", Some("ERoneToMany"), "a_author_id", None);
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert_eq!(
            relations,
            vec![ResolvedRelation {
                from_table: "BOOKS".to_string(),
                from_column: "AUTHOR".to_string(),
                to_table: "AUTHOR".to_string(),
                to_column: "AUTHOR_ID".to_string(),
            }]
        );
        assert_eq!(relations[0].update().column_type(), Some("Ref:AUTHOR"));
        assert_eq!(diagnostics.count_of(DiagnosticKind::PlannedChange), 1);
        assert_eq!(diagnostics.error_count(), 0);
    }

    #[test]
    fn test_arrow_rule_reversed() {
        let arena = library();
        let candidate = candidate(&arena, "a_author_id", None, "a_book_author", Some("ERoneToMany"));
        let (relations, _) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert_eq!(relations[0].from_table, "BOOKS");
    }

    #[test]
    fn test_arrows_at_both_ends_fall_through() {
        let arena = library();
        let candidate = candidate(
            &arena,
            "a_book_author",
            Some("ERoneToMany"),
            "a_author_id",
            Some("ERmandOne"),
        );
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert!(relations.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::AmbiguousRelationDirection), 1);
    }

    #[test]
    fn test_reference_metadata_rule() {
        let arena = library();
        let mut candidate = candidate(&arena, "c_author", None, "a_book_author", None);
        candidate.reference = Some(FieldReference {
            class: "AUTHOR".to_string(),
            attribute: "AUTHOR_ID".to_string(),
        });
        candidate.ref_attribute = Some("AUTHOR_ID".to_string());
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert_eq!(diagnostics.error_count(), 0);
        assert_eq!(relations[0].from_column, "AUTHOR");
        assert_eq!(relations[0].to_table, "AUTHOR");
        assert_eq!(relations[0].to_column, "AUTHOR_ID");
    }

    #[test]
    fn test_reference_metadata_matching_neither_is_ambiguous() {
        let arena = library();
        let mut candidate = candidate(&arena, "a_name", None, "a_book_author", None);
        candidate.reference = Some(FieldReference {
            class: "PUBLISHER".to_string(),
            attribute: "PUBLISHER_ID".to_string(),
        });
        // An attribute-pair match must not be consulted once metadata is present
        candidate.ref_attribute = Some("NAME".to_string());
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert!(relations.is_empty());
        let message = &diagnostics
            .of_kind(DiagnosticKind::AmbiguousRelationDirection)
            .next()
            .unwrap()
            .message;
        assert!(message.contains("neither"));
    }

    #[test]
    fn test_attribute_pair_rule_names_referenced_side() {
        let arena = library();
        let mut candidate = candidate(&arena, "a_book_author", None, "a_author_id", None);
        candidate.ref_attribute = Some("ID".to_string());
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert_eq!(diagnostics.error_count(), 0);
        assert_eq!(relations[0].from_table, "BOOKS");
        assert_eq!(relations[0].to_column, "AUTHOR_ID");
    }

    #[test]
    fn test_self_relation_is_ambiguous() {
        let arena = library();
        let candidate = candidate(&arena, "a_book_author", Some("ERoneToMany"), "a_book_id", None);
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert!(relations.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::AmbiguousRelationDirection), 1);
    }

    #[test]
    fn test_table_endpoint_requires_ref_attribute() {
        let arena = library();
        let candidate = candidate(&arena, "a_book_author", Some("ERoneToMany"), "c_author", None);
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert!(relations.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::UnresolvableRelationEndpoint), 1);
    }

    #[test]
    fn test_dangling_and_detached_endpoints() {
        let arena = library();
        let dangling = candidate(&arena, "a_book_author", Some("ERoneToMany"), "gone", None);
        let (_, diagnostics) = resolve(&dangling, &arena, &snapshot(ANY_TYPE));
        assert_eq!(diagnostics.count_of(DiagnosticKind::DanglingRelationEndpoint), 1);

        let mut detached = candidate(&arena, "a_book_author", Some("ERoneToMany"), "c_author", None);
        detached.target.id = None;
        detached.target.entity = None;
        let (_, diagnostics) = resolve(&detached, &arena, &snapshot(ANY_TYPE));
        assert_eq!(diagnostics.count_of(DiagnosticKind::UnresolvableRelationEndpoint), 1);
    }

    #[test]
    fn test_missing_fields_and_applied_relations() {
        let arena = library();
        let candidate = candidate(&arena, "a_book_author", Some("ERoneToMany"), "a_author_id", None);

        let (relations, diagnostics) = resolve(&candidate, &arena, &SchemaSnapshot::new());
        assert!(relations.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::TargetFieldMissing), 1);

        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot("Ref:AUTHOR"));
        assert!(relations.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::RelationAlreadyApplied), 1);
        assert_eq!(diagnostics.error_count(), 0);
    }

    #[test]
    fn test_other_endpoint_is_unresolvable() {
        let arena = library();
        let candidate = candidate(&arena, "note", Some("ERoneToMany"), "a_author_id", None);
        let (relations, diagnostics) = resolve(&candidate, &arena, &snapshot(ANY_TYPE));
        assert!(relations.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::UnresolvableRelationEndpoint), 1);
    }

    #[test]
    fn test_primary_key_column() {
        let config = InferenceConfig::default();
        assert_eq!(primary_key_column(&config, "CITIES", "ID"), "CITY_ID");
        assert_eq!(primary_key_column(&config, "CITIES", "NAME"), "NAME");
    }
}
