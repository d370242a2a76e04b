//! IB-012: Node.js descriptors (TypeScript type spelling).

use super::{
    camel_case, normalize_type_name, object_ref, DescriptorError, DocLanguageHelper, Language, ModuleContext,
    ModuleContexts,
};
use crate::core::types::{ObjectKind, Type};

const DOC_ROOT: &str = "/docs/reference/pkg/nodejs/pulumi";

/// Node.js adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodejsDocHelper;

impl NodejsDocHelper {
    fn type_string(&self, package: &str, ctx: &ModuleContext, ty: &Type, input: bool) -> String {
        match ty {
            Type::Any => "any".to_string(),
            Type::Bool => "boolean".to_string(),
            Type::Int | Type::Number => "number".to_string(),
            Type::String => "string".to_string(),
            Type::List(el) => {
                let inner = self.type_string(package, ctx, el, input);
                if inner.contains(' ') {
                    format!("({})[]", inner)
                } else {
                    format!("{}[]", inner)
                }
            }
            Type::Map(el) => format!("{{[key: string]: {}}}", self.type_string(package, ctx, el, input)),
            Type::Object(obj) => {
                let Some(r) = object_ref(obj.token.as_deref(), ctx) else {
                    return "{[key: string]: any}".to_string();
                };
                if obj.kind == ObjectKind::Plain {
                    let namespace = if input { "inputs" } else { "outputs" };
                    let module = r.module.unwrap_or(ctx.module.as_str());
                    if module.is_empty() {
                        format!("{}.{}", namespace, r.name)
                    } else {
                        format!("{}.{}.{}", namespace, module, r.name)
                    }
                } else {
                    match r.module {
                        None => r.name.to_string(),
                        Some("") => format!("{}.{}", package, r.name),
                        Some(m) => format!("{}.{}", m, r.name),
                    }
                }
            }
        }
    }
}

impl DocLanguageHelper for NodejsDocHelper {
    fn language(&self) -> Language {
        Language::Nodejs
    }

    fn resource_type_doc_link(&self, package: &str, module: &str, type_name: &str) -> String {
        let path = match (package.is_empty(), module.is_empty()) {
            (false, false) => format!("{}/{}", package, module),
            (true, _) => module.to_string(),
            (false, true) => package.to_string(),
        };
        format!("{}/{}/#{}", DOC_ROOT, path, normalize_type_name(type_name))
    }

    fn resource_io_doc_link(&self, package: &str, _module: &str, type_name: &str, input: bool) -> String {
        let direction = if input { "input" } else { "output" };
        format!(
            "{}/{}/types/{}/#{}",
            DOC_ROOT,
            package,
            direction,
            normalize_type_name(type_name)
        )
    }

    fn function_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let link = self.resource_type_doc_link(package, module, type_name);
        if input {
            link + "Args"
        } else {
            link + "Result"
        }
    }

    fn builtin_type_doc_link(&self, type_name: &str) -> String {
        format!(
            "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/{}",
            type_name
        )
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
        let rendered = self.type_string(&contexts.package, ctx, ty, input);
        Ok(if optional {
            format!("{} | undefined", rendered)
        } else {
            rendered
        })
    }

    fn property_name(&self, name: &str) -> String {
        camel_case(name)
    }

    fn resource_lookup_result_name(&self, resource_name: &str) -> String {
        format!("Get{}Result", resource_name)
    }
}
