//! Structural extraction for Rust sources using `syn`.

use super::extractor::{SourceLanguage, SourceUnit, SourceUnitExtractor, dedup_units};
use crate::{Error, Result};
use std::path::Path;
use syn::ext::IdentExt;
use syn::{Attribute, ImplItem, Item, TraitItem, Type, Visibility};

/// Extracts `(type, fn)` pairs from `impl` and `trait` blocks.
///
/// Inherent impls contribute their `pub` fns; trait impls and trait
/// definitions contribute every fn. Inline modules are descended, except
/// `#[cfg(test)]` ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustExtractor;

impl SourceUnitExtractor for RustExtractor {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Rust
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("rs")
    }

    fn is_entry_point(&self, path: &Path) -> bool {
        matches!(
            path.file_name().and_then(|n| n.to_str()),
            Some("lib.rs" | "main.rs" | "mod.rs" | "build.rs")
        )
    }

    fn extract(&self, path: &Path, source: &str) -> Result<Vec<SourceUnit>> {
        let parsed = syn::parse_file(source).map_err(|e| Error::SourceParse {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        let mut units = Vec::new();
        collect_items(&parsed.items, &mut units);
        Ok(dedup_units(units))
    }
}

fn collect_items(items: &[Item], units: &mut Vec<SourceUnit>) {
    for item in items {
        match item {
            Item::Impl(block) => {
                let Some(group) = type_name(&block.self_ty) else {
                    continue;
                };
                let is_trait_impl = block.trait_.is_some();
                for member in &block.items {
                    if let ImplItem::Fn(f) = member {
                        if is_trait_impl || matches!(f.vis, Visibility::Public(_)) {
                            push_unit(units, &group, &f.sig.ident.unraw().to_string());
                        }
                    }
                }
            },
            Item::Trait(def) => {
                let group = def.ident.unraw().to_string();
                for member in &def.items {
                    if let TraitItem::Fn(f) = member {
                        push_unit(units, &group, &f.sig.ident.unraw().to_string());
                    }
                }
            },
            Item::Mod(module) if !is_test_module(&module.attrs) => {
                if let Some((_, nested)) = &module.content {
                    collect_items(nested, units);
                }
            },
            _ => {},
        }
    }
}

fn push_unit(units: &mut Vec<SourceUnit>, group: &str, slot: &str) {
    if !slot.starts_with('_') {
        units.push(SourceUnit::new(group, slot));
    }
}

/// Last path segment of the implementing type (`Foo` for `impl<T> a::Foo<T>`).
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.unraw().to_string()),
        Type::Reference(r) => type_name(&r.elem),
        Type::Paren(p) => type_name(&p.elem),
        Type::Group(g) => type_name(&g.elem),
        _ => None,
    }
}

fn is_test_module(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg") && attr.parse_args::<syn::Ident>().is_ok_and(|i| i == "test")
    })
}
