//! Type descriptors: the merged, immutable view of a type's hierarchy.
//!
//! # Scan order
//!
//! ```text
//! Concrete ─▶ Parent ─▶ Grandparent ─▶ … (stop boundary, excluded)
//!    then interfaces: Concrete's, Parent's, … each followed by its super-interfaces
//! ```
//!
//! Class levels come before interface levels so a method declared on any
//! ancestor wins over an interface default with the same signature.
//! A method is dropped when one with the same name and parameter types was
//! already collected closer to the concrete type.

use super::member::{ConstructorDef, FieldDef, MethodDef};
use super::spec::{Describe, TypeSpec};
use super::TypeKey;

/// Merged members of a type, in scan order.
pub struct TypeDescriptor<T> {
    key: TypeKey,
    depth: usize,
    is_abstract: bool,
    hierarchy: Vec<TypeKey>,
    fields: Vec<FieldDef<T>>,
    methods: Vec<MethodDef<T>>,
    constructors: Vec<ConstructorDef<T>>,
}

impl<T: Describe> TypeDescriptor<T> {
    /// Describe `T` and merge its hierarchy, stopping at any of `boundaries`.
    pub fn build(boundaries: &[TypeKey]) -> Self {
        let mut spec = TypeSpec::<T>::new();
        T::describe(&mut spec);
        Self::from_spec(spec, boundaries)
    }
}

impl<T: 'static> TypeDescriptor<T> {
    pub(crate) fn from_spec(spec: TypeSpec<T>, boundaries: &[TypeKey]) -> Self {
        let key = spec.key;
        let is_abstract = spec.is_abstract;
        let depth = depth_of(&spec);

        let mut descriptor = Self {
            key,
            depth,
            is_abstract,
            hierarchy: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        };

        // Constructors belong to the concrete type only.
        let mut spec = spec;
        descriptor.constructors = std::mem::take(&mut spec.constructors);

        // Walk class levels first, remembering interface levels for later.
        let mut interfaces = Vec::new();
        let mut level = Some(spec);
        while let Some(mut current) = level {
            if boundaries.contains(&current.key) {
                tracing::trace!(ty = %key, boundary = %current.key, "stop boundary reached");
                break;
            }
            let parent = current.parent.take().map(|p| *p);
            interfaces.append(&mut current.interfaces);
            descriptor.collect_level(current);
            level = parent;
        }

        for interface in interfaces {
            descriptor.collect_interface(interface, boundaries);
        }

        descriptor
    }

    fn collect_interface(&mut self, mut level: TypeSpec<T>, boundaries: &[TypeKey]) {
        if boundaries.contains(&level.key) {
            return;
        }
        let supers = std::mem::take(&mut level.interfaces);
        self.collect_level(level);
        for sup in supers {
            self.collect_interface(sup, boundaries);
        }
    }

    fn collect_level(&mut self, level: TypeSpec<T>) {
        if !self.hierarchy.contains(&level.key) {
            self.hierarchy.push(level.key);
        }
        self.fields.extend(level.fields);
        for method in level.methods {
            let overridden = self
                .methods
                .iter()
                .any(|seen| seen.signature() == method.signature());
            if overridden {
                tracing::trace!(
                    ty = %self.key,
                    method = %method,
                    "dropping member overridden closer to the concrete type"
                );
                continue;
            }
            self.methods.push(method);
        }
    }

    /// Key of the described type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Number of parent levels above this type (interfaces do not count).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the type was declared abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Levels visited, in scan order.
    pub fn hierarchy(&self) -> &[TypeKey] {
        &self.hierarchy
    }

    /// Fields of every visited level, in scan order.
    pub fn fields(&self) -> &[FieldDef<T>] {
        &self.fields
    }

    /// Methods after override merging, in scan order.
    pub fn methods(&self) -> &[MethodDef<T>] {
        &self.methods
    }

    /// Constructors of the concrete type, in declaration order.
    pub fn constructors(&self) -> &[ConstructorDef<T>] {
        &self.constructors
    }

    /// Zero-parameter method by name, as used by accessor lookup.
    pub fn find_accessor(&self, name: &str) -> Option<&MethodDef<T>> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.params().is_empty())
    }
}

/// Number of parent levels above `M`, without building a full descriptor.
pub fn hierarchy_depth<M: Describe>() -> usize {
    let mut spec = TypeSpec::<M>::new();
    M::describe(&mut spec);
    depth_of(&spec)
}

fn depth_of<T>(spec: &TypeSpec<T>) -> usize {
    let mut depth = 0;
    let mut parent = spec.parent.as_deref();
    while let Some(level) = parent {
        depth += 1;
        parent = level.parent.as_deref();
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallArgs;

    #[derive(Default)]
    struct Root {
        calls: Vec<&'static str>,
    }

    impl Describe for Root {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.post_construct("init", |r| {
                r.calls.push("root.init");
                Ok(())
            });
            spec.post_construct("root_only", |r| {
                r.calls.push("root.root_only");
                Ok(())
            });
            spec.field::<u64>("id");
        }
    }

    #[derive(Default)]
    struct Middle {
        root: Root,
    }

    impl AsRef<Root> for Middle {
        fn as_ref(&self) -> &Root {
            &self.root
        }
    }

    impl AsMut<Root> for Middle {
        fn as_mut(&mut self) -> &mut Root {
            &mut self.root
        }
    }

    trait Named {}

    fn describe_named<T: AsMut<Root> + 'static>(spec: &mut TypeSpec<T>) {
        spec.post_construct("init", |t: &mut T| {
            t.as_mut().calls.push("named.init");
            Ok(())
        });
        spec.post_construct("named_only", |t: &mut T| {
            t.as_mut().calls.push("named.named_only");
            Ok(())
        });
    }

    impl Describe for Middle {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.extends::<Root>();
            spec.implements::<dyn Named>(describe_named::<Middle>);
            spec.field::<String>("name");
        }
    }

    struct Leaf {
        middle: Middle,
    }

    impl AsRef<Middle> for Leaf {
        fn as_ref(&self) -> &Middle {
            &self.middle
        }
    }

    impl AsMut<Middle> for Leaf {
        fn as_mut(&mut self) -> &mut Middle {
            &mut self.middle
        }
    }

    impl Describe for Leaf {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.extends::<Middle>();
            spec.post_construct("init", |l| {
                l.middle.root.calls.push("leaf.init");
                Ok(())
            });
            spec.constructor().build(|_| {
                Ok(Leaf {
                    middle: Middle::default(),
                })
            });
        }
    }

    fn method_names<T: 'static>(d: &TypeDescriptor<T>) -> Vec<(String, String)> {
        d.methods()
            .iter()
            .map(|m| (m.declaring().to_string(), m.name().to_string()))
            .collect()
    }

    #[test]
    fn test_descriptor_merges_overrides_closest_first() {
        let descriptor = TypeDescriptor::<Leaf>::build(&[]);

        assert_eq!(descriptor.depth(), 2);
        assert_eq!(
            method_names(&descriptor),
            vec![
                ("Leaf".to_string(), "init".to_string()),
                ("Root".to_string(), "root_only".to_string()),
                ("Named".to_string(), "named_only".to_string()),
            ]
        );
        assert_eq!(descriptor.constructors().len(), 1);
        assert_eq!(descriptor.fields().len(), 2);
    }

    fn short(name: &str) -> String {
        name.rsplit("::").next().unwrap_or(name).to_string()
    }

    #[test]
    fn test_descriptor_hierarchy_scan_order() {
        let descriptor = TypeDescriptor::<Leaf>::build(&[]);
        let levels: Vec<_> = descriptor
            .hierarchy()
            .iter()
            .map(|k| short(k.name()))
            .collect();
        assert_eq!(levels, vec!["Leaf", "Middle", "Root", "Named"]);
    }

    #[test]
    fn test_stop_boundary_excludes_levels() {
        let descriptor = TypeDescriptor::<Leaf>::build(&[TypeKey::of::<Middle>()]);

        assert_eq!(descriptor.hierarchy(), &[TypeKey::of::<Leaf>()]);
        assert_eq!(descriptor.methods().len(), 1);
        assert!(descriptor.fields().is_empty());
        // Depth is the distance to the root, boundaries do not change it.
        assert_eq!(descriptor.depth(), 2);
    }

    #[test]
    fn test_lifted_members_reach_ancestor_state() {
        let descriptor = TypeDescriptor::<Leaf>::build(&[]);
        let mut leaf = Leaf {
            middle: Middle::default(),
        };
        for method in descriptor.methods() {
            method
                .body
                .call_mut(&mut leaf, &CallArgs::empty())
                .expect("callback should run");
        }
        assert_eq!(
            leaf.middle.root.calls,
            vec!["leaf.init", "root.root_only", "named.named_only"]
        );
    }

    #[test]
    fn test_hierarchy_depth_matches_descriptor() {
        assert_eq!(hierarchy_depth::<Leaf>(), 2);
        assert_eq!(hierarchy_depth::<Root>(), 0);
    }

    #[test]
    fn test_find_accessor_requires_zero_params() {
        let descriptor = TypeDescriptor::<Leaf>::build(&[]);
        assert!(descriptor.find_accessor("root_only").is_some());
        assert!(descriptor.find_accessor("missing").is_none());
    }
}
