//! Constructor selection.
//!
//! # Algorithm
//!
//! ```text
//! 1. exactly one constructor          → take it, mismatches fail when building
//! 2. plain constructors, in order     → first with equal arity whose parameters
//!                                       all accept the argument types (boxing table)
//! 3. nothing matched, zero arguments  → first wired constructor
//! 4. otherwise                        → NoSuitableConstructor
//! ```
//!
//! A wired constructor's assisted parameters consume the positional
//! arguments left to right, wherever they sit in the signature; every other
//! parameter is resolved by the provider. Leftover or missing positional
//! arguments are a `WrongArgumentCount`.

use crate::construct::DependencyKey;
use crate::error::ConstructionError;
use crate::types::{ConstructorDef, TypeDescriptor, TypeKey};

/// Where one constructor parameter gets its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// The caller's positional argument at this index.
    Positional(usize),
    /// The dependency provider.
    Resolved(DependencyKey),
}

/// The selected constructor and the source of each of its parameters.
///
/// Owned by a single construction call.
pub struct ConstructionPlan<'d, T> {
    constructor: &'d ConstructorDef<T>,
    sources: Vec<ParamSource>,
}

impl<'d, T> ConstructionPlan<'d, T> {
    /// The selected constructor.
    pub fn constructor(&self) -> &'d ConstructorDef<T> {
        self.constructor
    }

    /// Parameter sources, in parameter order.
    pub fn sources(&self) -> &[ParamSource] {
        &self.sources
    }
}

/// Select the constructor of `descriptor`'s type for arguments of types `args`.
pub fn resolve_constructor<'d, T: 'static>(
    descriptor: &'d TypeDescriptor<T>,
    args: &[TypeKey],
) -> Result<ConstructionPlan<'d, T>, ConstructionError> {
    let constructors = descriptor.constructors();

    if let [only] = constructors {
        return plan(only, args);
    }

    let positional = constructors.iter().find(|c| {
        !c.is_wired()
            && c.params().len() == args.len()
            && c.params()
                .iter()
                .zip(args)
                .all(|(param, arg)| param.ty().accepts(*arg))
    });
    if let Some(constructor) = positional {
        return plan(constructor, args);
    }

    if args.is_empty() {
        if let Some(wired) = constructors.iter().find(|c| c.is_wired()) {
            return plan(wired, args);
        }
    }

    Err(ConstructionError::NoSuitableConstructor {
        ty: descriptor.key(),
        candidates: constructors.iter().map(ToString::to_string).collect(),
        args: args.iter().map(ToString::to_string).collect(),
    })
}

fn plan<'d, T>(
    constructor: &'d ConstructorDef<T>,
    args: &[TypeKey],
) -> Result<ConstructionPlan<'d, T>, ConstructionError> {
    if !constructor.is_wired() {
        return Ok(ConstructionPlan {
            constructor,
            sources: (0..constructor.params().len())
                .map(ParamSource::Positional)
                .collect(),
        });
    }

    let required = constructor.assisted_count();
    if required != args.len() {
        return Err(ConstructionError::WrongArgumentCount {
            constructor: constructor.to_string(),
            required,
            provided: args.len(),
        });
    }

    let mut next = 0;
    let sources = constructor
        .params()
        .iter()
        .map(|param| {
            if param.is_assisted() {
                next += 1;
                ParamSource::Positional(next - 1)
            } else {
                ParamSource::Resolved(DependencyKey::new(param.ty(), param.qualifiers().clone()))
            }
        })
        .collect();

    Ok(ConstructionPlan {
        constructor,
        sources,
    })
}
