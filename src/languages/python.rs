//! IB-013: Python descriptors (typing-module spelling, snake_case names).

use super::{
    normalize_type_name, object_ref, snake_case, DescriptorError, DocLanguageHelper, Language, ModuleContext,
    ModuleContexts,
};
use crate::core::types::{ObjectKind, Type};

const DOC_ROOT: &str = "/docs/reference/pkg/python";

/// Python adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonDocHelper;

/// The importable module path of a package module (`pulumi_aws/s3`).
fn module_path(package: &str, module: &str) -> String {
    let root = match package {
        "" => String::new(),
        "pulumi" => "pulumi".to_string(),
        p => format!("pulumi_{}", p.replace('-', "_")),
    };
    match (root.is_empty(), module.is_empty()) {
        (false, false) => format!("{}/{}", root, module),
        (true, _) => module.to_string(),
        (false, true) => root,
    }
}

impl PythonDocHelper {
    fn type_string(&self, ctx: &ModuleContext, ty: &Type, input: bool) -> String {
        match ty {
            Type::Any => "Any".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Number => "float".to_string(),
            Type::String => "str".to_string(),
            Type::List(el) => format!("List[{}]", self.type_string(ctx, el, input)),
            Type::Map(el) => format!("Mapping[str, {}]", self.type_string(ctx, el, input)),
            Type::Object(obj) => {
                let Some(r) = object_ref(obj.token.as_deref(), ctx) else {
                    return "Mapping[str, Any]".to_string();
                };
                if obj.kind == ObjectKind::Plain {
                    if input {
                        format!("{}Args", r.name)
                    } else {
                        format!("outputs.{}", r.name)
                    }
                } else {
                    match r.module {
                        Some(m) if !m.is_empty() => format!("{}.{}", m, r.name),
                        _ => r.name.to_string(),
                    }
                }
            }
        }
    }
}

impl DocLanguageHelper for PythonDocHelper {
    fn language(&self) -> Language {
        Language::Python
    }

    fn resource_type_doc_link(&self, package: &str, module: &str, type_name: &str) -> String {
        let path = module_path(package, module);
        format!(
            "{}/{}/#{}.{}",
            DOC_ROOT,
            path,
            path.replace('/', "."),
            normalize_type_name(type_name)
        )
    }

    fn resource_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let path = module_path(package, module);
        let name = normalize_type_name(type_name);
        if input {
            format!("{}/{}/#{}.{}Args", DOC_ROOT, path, path.replace('/', "."), name)
        } else {
            format!("{}/{}/outputs/#{}.outputs.{}", DOC_ROOT, path, path.replace('/', "."), name)
        }
    }

    fn function_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let link = self.resource_type_doc_link(package, module, type_name);
        if input {
            link
        } else {
            link + "Result"
        }
    }

    fn builtin_type_doc_link(&self, type_name: &str) -> String {
        format!("https://docs.python.org/3/library/stdtypes.html#{}", type_name)
    }

    fn language_type_string(
        &self,
        contexts: &ModuleContexts,
        module: &str,
        ty: &Type,
        input: bool,
        optional: bool,
    ) -> Result<String, DescriptorError> {
        let ctx = contexts.require(module, ty)?;
        let rendered = self.type_string(ctx, ty, input);
        Ok(if optional {
            format!("Optional[{}]", rendered)
        } else {
            rendered
        })
    }

    fn property_name(&self, name: &str) -> String {
        snake_case(name)
    }

    fn resource_lookup_result_name(&self, resource_name: &str) -> String {
        format!("Get{}Result", resource_name)
    }
}
