use std::collections::BTreeMap;

use toydata_notation::{CountSpec, Directive, FieldSpec, ObjectKey, ObjectTemplate, TableSpec, Verb};

use crate::errors::{GenerationError, ReferenceKind};

/// One field of a composed template.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Generated directly by a value generator.
    Value(Directive),
    /// A nested record (or list of records when counted) of a composed object.
    Nested {
        object: ObjectKey,
        count: Option<CountSpec>,
        fields: Vec<FieldPlan>,
    },
}

impl FieldPlan {
    /// Name of the shared column when the field is a bare `[[name]]`.
    pub fn shared_ref(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Value(directive) if directive.count.is_none() => directive.shared_ref(),
            _ => None,
        }
    }
}

/// Object templates indexed by namespace, then name.
///
/// Templates are never mutated; composition always produces a new field list.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    namespaces: BTreeMap<String, BTreeMap<String, ObjectTemplate>>,
}

impl ObjectRegistry {
    pub fn new(objects: &[ObjectTemplate]) -> Self {
        let mut namespaces: BTreeMap<String, BTreeMap<String, ObjectTemplate>> = BTreeMap::new();
        for object in objects {
            namespaces
                .entry(object.key.namespace.clone())
                .or_default()
                .insert(object.key.name.clone(), object.clone());
        }
        Self { namespaces }
    }

    pub fn get(&self, key: &ObjectKey) -> Result<&ObjectTemplate, GenerationError> {
        self.namespaces
            .get(&key.namespace)
            .and_then(|objects| objects.get(&key.name))
            .ok_or_else(|| GenerationError::undefined(ReferenceKind::Object, key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObjectKey> {
        self.namespaces
            .values()
            .flat_map(|objects| objects.values().map(|object| &object.key))
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compose every template once without overrides.
    ///
    /// Surfaces cycles and undefined nested objects before any table runs.
    pub fn verify(&self) -> Result<(), GenerationError> {
        for key in self.keys() {
            self.compose(key, &[])?;
        }
        Ok(())
    }

    /// Effective field list of `key` with `overrides` layered on top.
    ///
    /// Overrides replace a base field of the same name in place; other
    /// overrides are appended in their own order.
    pub fn compose(
        &self,
        key: &ObjectKey,
        overrides: &[FieldSpec],
    ) -> Result<Vec<FieldPlan>, GenerationError> {
        let mut expanding = Vec::new();
        self.compose_object(key, overrides, &mut expanding)
    }

    /// Effective field list of a table: its base object (if any) plus its fields.
    pub fn compose_table(&self, table: &TableSpec) -> Result<Vec<FieldPlan>, GenerationError> {
        match &table.base {
            Some(base) => self.compose(base, &table.fields),
            None => self.expand(&table.fields, &mut Vec::new()),
        }
    }

    fn compose_object(
        &self,
        key: &ObjectKey,
        overrides: &[FieldSpec],
        expanding: &mut Vec<ObjectKey>,
    ) -> Result<Vec<FieldPlan>, GenerationError> {
        if let Some(start) = expanding.iter().position(|active| active == key) {
            let mut cycle = expanding[start..].to_vec();
            cycle.push(key.clone());
            return Err(GenerationError::CyclicObjectReference { cycle });
        }

        let template = self.get(key)?;
        let mut fields = template.fields.clone();
        for field in overrides {
            match fields.iter_mut().find(|base| base.name == field.name) {
                Some(base) => base.directive = field.directive.clone(),
                None => fields.push(field.clone()),
            }
        }

        expanding.push(key.clone());
        let composed = self.expand(&fields, expanding);
        expanding.pop();
        composed
    }

    fn expand(
        &self,
        fields: &[FieldSpec],
        expanding: &mut Vec<ObjectKey>,
    ) -> Result<Vec<FieldPlan>, GenerationError> {
        let mut plans = Vec::with_capacity(fields.len());
        for field in fields {
            let kind = match &field.directive.verb {
                Verb::ObjectRef(object) => FieldKind::Nested {
                    object: object.clone(),
                    count: field.directive.count.clone(),
                    fields: self.compose_object(object, &[], expanding)?,
                },
                _ => FieldKind::Value(field.directive.clone()),
            };
            plans.push(FieldPlan {
                name: field.name.clone(),
                kind,
            });
        }
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use toydata_notation::parse_directive;

    use super::*;

    fn field(name: &str, notation: &str) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            directive: parse_directive(notation).expect("directive"),
        }
    }

    fn object(namespace: &str, name: &str, fields: Vec<FieldSpec>) -> ObjectTemplate {
        ObjectTemplate {
            key: ObjectKey::new(namespace, name),
            fields,
        }
    }

    fn names(plans: &[FieldPlan]) -> Vec<&str> {
        plans.iter().map(|plan| plan.name.as_str()).collect()
    }

    #[test]
    fn overrides_replace_in_place_and_extensions_append() {
        let registry = ObjectRegistry::new(&[object(
            "core",
            "user",
            vec![field("id", "UNIQUE[int]"), field("name", "NAME")],
        )]);

        let plans = registry
            .compose(
                &ObjectKey::new("core", "user"),
                &[field("region", "LOCATION"), field("id", "UNIQUE[str]")],
            )
            .expect("compose");

        assert_eq!(names(&plans), vec!["id", "name", "region"]);
        let FieldKind::Value(directive) = &plans[0].kind else {
            panic!("id should be a value field");
        };
        assert_eq!(directive.raw, "UNIQUE[str]");

        let untouched = registry
            .get(&ObjectKey::new("core", "user"))
            .expect("template");
        assert_eq!(untouched.fields.len(), 2);
    }

    #[test]
    fn nested_objects_compose_into_nested_plans() {
        let registry = ObjectRegistry::new(&[
            object("core", "profile", vec![field("city", "LOCATION")]),
            object(
                "core",
                "user",
                vec![
                    field("name", "NAME"),
                    field("profile", "[[object.core.profile]]"),
                    field("friends", "[[object.core.profile]][2]"),
                ],
            ),
        ]);

        let plans = registry
            .compose(&ObjectKey::new("core", "user"), &[])
            .expect("compose");
        match &plans[2].kind {
            FieldKind::Nested {
                object,
                count,
                fields,
            } => {
                assert_eq!(object, &ObjectKey::new("core", "profile"));
                assert_eq!(count, &Some(CountSpec::Literal(2)));
                assert_eq!(names(fields), vec!["city"]);
            }
            other => panic!("expected nested plan, got {other:?}"),
        }
    }

    #[test]
    fn rejects_cycles_with_the_full_path() {
        let registry = ObjectRegistry::new(&[
            object("ns", "a", vec![field("b", "[[object.ns.b]]")]),
            object("ns", "b", vec![field("a", "[[object.ns.a]]")]),
        ]);

        let err = registry.verify().expect_err("cycle");
        match err {
            GenerationError::CyclicObjectReference { cycle } => {
                let cycle: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                assert_eq!(cycle, vec!["ns.a", "ns.b", "ns.a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn same_object_twice_in_siblings_is_not_a_cycle() {
        let registry = ObjectRegistry::new(&[
            object("core", "tag", vec![field("label", "POST_TAG")]),
            object(
                "core",
                "post",
                vec![
                    field("primary", "[[object.core.tag]]"),
                    field("secondary", "[[object.core.tag]]"),
                ],
            ),
        ]);
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn undefined_nested_objects_are_reported() {
        let registry = ObjectRegistry::new(&[object(
            "core",
            "user",
            vec![field("profile", "[[object.core.missing]]")],
        )]);
        assert!(matches!(
            registry.verify(),
            Err(GenerationError::UndefinedReference {
                kind: ReferenceKind::Object,
                ..
            })
        ));
    }
}
