//! Projections: record types derived from an origin type.
//!
//! A projection selects or ignores origin attributes, renames them,
//! optionally declares a different identity, and may combine in attributes
//! from other record types. The result is an ordinary [`RecordType`] whose
//! attributes remember their origin name and column, so records built from
//! origin records copy the right values and persist to the origin's table.
//!
//! Every name is checked when the projection is built, never at use time.

use crate::attribute::Attribute;
use crate::error::{CoreError, CoreResult};
use crate::schema::RecordType;
use std::collections::HashSet;
use std::sync::Arc;

/// Definition of a projection over an origin record type.
///
/// ```rust
/// use recsync_core::{Attribute, Projection, RecordType, ValueType};
///
/// let person = RecordType::builder("person")
///     .identity(Attribute::new("id", ValueType::Integer))
///     .attribute(Attribute::new("name", ValueType::Text))
///     .attribute(Attribute::new("email", ValueType::Text))
///     .build()
///     .unwrap();
///
/// let contact = Projection::of(&person)
///     .named("contact")
///     .select(["email"])
///     .rename("address", "email")
///     .build()
///     .unwrap();
///
/// assert_eq!(contact.value_names(), vec!["address"]);
/// assert_eq!(contact.attribute("address").unwrap().column_name(), "email");
/// ```
#[derive(Debug, Clone)]
pub struct Projection {
    name: String,
    origin: Arc<RecordType>,
    select: Option<Vec<String>>,
    ignore: Vec<String>,
    renames: Vec<(String, String)>,
    identity: Option<Vec<String>>,
    combined: Vec<(Arc<RecordType>, Vec<String>)>,
}

impl Projection {
    /// Starts a projection of `origin`, named after it.
    pub fn of(origin: &Arc<RecordType>) -> Self {
        Self {
            name: origin.name().to_string(),
            origin: Arc::clone(origin),
            select: None,
            ignore: Vec::new(),
            renames: Vec::new(),
            identity: None,
            combined: Vec::new(),
        }
    }

    /// Names the projected type.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keeps only these value attributes (identity attributes are always kept
    /// unless an alternate identity is declared).
    #[must_use]
    pub fn select<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select
            .get_or_insert_with(Vec::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Drops these attributes.
    #[must_use]
    pub fn ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    /// Exposes origin attribute `old_name` as `new_name`.
    #[must_use]
    pub fn rename(mut self, new_name: impl Into<String>, old_name: impl Into<String>) -> Self {
        self.renames.push((new_name.into(), old_name.into()));
        self
    }

    /// Declares an alternate identity, by projected attribute names.
    #[must_use]
    pub fn identity<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Combines in attributes of another record type.
    ///
    /// Combined attributes are compared by diff but are not persisted to the
    /// origin's table.
    #[must_use]
    pub fn combine<I, S>(mut self, other: &Arc<RecordType>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.combined.push((
            Arc::clone(other),
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    fn check_origin_names<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> CoreResult<()> {
        for name in names {
            if self.origin.attribute(name).is_none() {
                return Err(CoreError::unknown_attribute(self.origin.name(), name));
            }
        }
        Ok(())
    }

    /// Validates the definition and produces the projected record type.
    ///
    /// # Errors
    ///
    /// - `UnknownAttribute` for any selected, ignored, renamed, identity or
    ///   combined name that does not exist
    /// - `InvalidProjection` if the projection drops an identity attribute
    ///   without declaring an alternate identity
    /// - `DuplicateAttribute` if renames or combinations collide
    pub fn build(self) -> CoreResult<Arc<RecordType>> {
        if let Some(select) = &self.select {
            self.check_origin_names(select)?;
        }
        self.check_origin_names(&self.ignore)?;
        self.check_origin_names(self.renames.iter().map(|(_, old)| old))?;
        for (other, names) in &self.combined {
            for name in names {
                other.require(name)?;
            }
        }

        let ignored: HashSet<&str> = self.ignore.iter().map(String::as_str).collect();
        let selected: Option<HashSet<&str>> = self
            .select
            .as_ref()
            .map(|s| s.iter().map(String::as_str).collect());
        let renamed = |old: &str| {
            self.renames
                .iter()
                .find(|(_, o)| o == old)
                .map(|(new, _)| new.as_str())
        };

        let mut attributes = Vec::new();
        for attr in self.origin.attributes() {
            let name = attr.name();
            let keep = if attr.is_identity() && self.identity.is_none() {
                if ignored.contains(name) {
                    return Err(CoreError::invalid_projection(
                        &self.name,
                        format!("identity attribute '{name}' cannot be ignored"),
                    ));
                }
                true
            } else {
                !ignored.contains(name)
                    && selected
                        .as_ref()
                        .map_or(true, |s| s.contains(name) || renamed(name).is_some())
            };
            if !keep {
                continue;
            }

            let mut projected = attr.clone();
            if let Some(new_name) = renamed(name) {
                projected = projected.renamed(new_name);
            }
            attributes.push(projected);
        }

        if let Some(identity) = &self.identity {
            if identity.is_empty() {
                return Err(CoreError::invalid_projection(
                    &self.name,
                    "alternate identity must name at least one attribute",
                ));
            }
            for name in identity {
                if !attributes.iter().any(|a| a.name() == name) {
                    return Err(CoreError::unknown_attribute(&self.name, name));
                }
            }
            // Identity attributes come first, in the declared order.
            let mut ordered = Vec::with_capacity(attributes.len());
            for name in identity {
                if let Some(i) = attributes.iter().position(|a| a.name() == name) {
                    ordered.push(attributes.remove(i).as_identity(true));
                }
            }
            ordered.extend(attributes.into_iter().map(|a| a.as_identity(false)));
            attributes = ordered;
        }

        for (other, names) in &self.combined {
            for name in names {
                let attr = other.require(name)?;
                attributes.push(attr.clone().as_identity(false).as_transient());
            }
        }

        let root = self
            .origin
            .origin()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.origin));
        RecordType::from_parts(
            self.name,
            self.origin.table().to_string(),
            attributes,
            Some(root),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ValueType;
    use crate::record::Record;
    use recsync_codec::Value;

    fn t_a() -> Arc<RecordType> {
        RecordType::builder("t_a")
            .identity(Attribute::new("a", ValueType::Integer))
            .attribute(Attribute::new("b", ValueType::Integer))
            .attribute(Attribute::new("c", ValueType::Integer))
            .attribute(Attribute::new("d", ValueType::Integer))
            .build()
            .unwrap()
    }

    fn origin_record(ty: &Arc<RecordType>) -> Record {
        Record::from_pairs(
            ty,
            &[
                ("a", 1.into()),
                ("b", 2.into()),
                ("c", 3.into()),
                ("d", 4.into()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn select_keeps_identity() {
        let ty = t_a();
        let view = Projection::of(&ty).select(["b"]).build().unwrap();
        assert_eq!(view.identity_names(), vec!["a"]);
        assert_eq!(view.value_names(), vec!["b"]);
        assert_eq!(view.table(), "t_a");
        assert!(Arc::ptr_eq(view.origin().unwrap(), &ty));

        let r = Record::from_record(&view, &origin_record(&ty)).unwrap();
        assert_eq!(r.values(), &[Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn ignore_drops_attributes() {
        let ty = t_a();
        let view = Projection::of(&ty).ignore(["c", "d"]).build().unwrap();
        assert_eq!(view.value_names(), vec!["b"]);
    }

    #[test]
    fn rename_copies_from_old_name() {
        let ty = t_a();
        let view = Projection::of(&ty)
            .select(["b"])
            .rename("bee", "b")
            .build()
            .unwrap();
        assert_eq!(view.value_names(), vec!["bee"]);
        let attr = view.attribute("bee").unwrap();
        assert_eq!(attr.column_name(), "b");
        assert_eq!(attr.source(), "b");

        let r = Record::from_record(&view, &origin_record(&ty)).unwrap();
        assert_eq!(r.get("bee"), Some(&Value::Integer(2)));

        // And back again.
        let widened = Record::from_record(&ty, &r).unwrap();
        assert_eq!(widened.get("b"), Some(&Value::Integer(2)));
    }

    #[test]
    fn alternate_identity() {
        let ty = t_a();
        let view = Projection::of(&ty).identity(["c"]).build().unwrap();
        assert_eq!(view.identity_names(), vec!["c"]);
        assert_eq!(view.value_names(), vec!["a", "b", "d"]);
        let r = Record::from_record(&view, &origin_record(&ty)).unwrap();
        assert_eq!(r.identity().values(), &[Value::Integer(3)]);
    }

    #[test]
    fn unknown_names_rejected_at_definition() {
        let ty = t_a();
        for projection in [
            Projection::of(&ty).select(["zz"]),
            Projection::of(&ty).ignore(["zz"]),
            Projection::of(&ty).rename("new", "zz"),
            Projection::of(&ty).identity(["zz"]),
        ] {
            let err = projection.build().unwrap_err();
            assert!(matches!(err, CoreError::UnknownAttribute { .. }), "{err}");
        }
    }

    #[test]
    fn ignoring_identity_requires_alternate() {
        let ty = t_a();
        let err = Projection::of(&ty).ignore(["a"]).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidProjection { .. }));

        let ok = Projection::of(&ty)
            .ignore(["a"])
            .identity(["b"])
            .build()
            .unwrap();
        assert_eq!(ok.identity_names(), vec!["b"]);
        assert!(ok.attribute("a").is_none());
    }

    #[test]
    fn rename_collision_rejected() {
        let ty = t_a();
        let err = Projection::of(&ty).rename("c", "b").build().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateAttribute { .. }));
    }

    #[test]
    fn combined_attributes_are_transient() {
        let ty = t_a();
        let extra = RecordType::builder("extra")
            .identity(Attribute::new("x", ValueType::Integer))
            .attribute(Attribute::new("note", ValueType::Text))
            .build()
            .unwrap();
        let view = Projection::of(&ty)
            .select(["b"])
            .combine(&extra, ["note"])
            .build()
            .unwrap();
        let note = view.attribute("note").unwrap();
        assert!(note.is_transient());
        assert!(!note.is_identity());

        let err = Projection::of(&ty).combine(&extra, ["nope"]).build().unwrap_err();
        assert!(matches!(err, CoreError::UnknownAttribute { .. }));
    }

    #[test]
    fn projection_of_projection_keeps_root() {
        let ty = t_a();
        let first = Projection::of(&ty).select(["b", "c"]).build().unwrap();
        let second = Projection::of(&first).select(["b"]).build().unwrap();
        assert!(Arc::ptr_eq(second.origin().unwrap(), &ty));
    }
}
