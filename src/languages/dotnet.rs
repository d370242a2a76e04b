//! IB-014: .NET descriptors (C# type spelling, PascalCase names).

use super::{
    normalize_type_name, object_ref, title_case, DescriptorError, DocLanguageHelper, Language, ModuleContext,
    ModuleContexts,
};
use crate::core::types::{ObjectKind, Type};

const DOC_ROOT: &str = "/docs/reference/pkg/dotnet";

/// .NET adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotnetDocHelper;

/// `azure-native` -> `AzureNative`.
fn namespace_segment(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_').map(title_case).collect()
}

/// The assembly and the namespace of a package module.
fn namespace(package: &str, module: &str) -> (String, String) {
    let assembly = match package {
        "" | "pulumi" => "Pulumi".to_string(),
        p => format!("Pulumi.{}", namespace_segment(p)),
    };
    let namespace = if module.is_empty() {
        assembly.clone()
    } else {
        format!("{}.{}", assembly, namespace_segment(module))
    };
    (assembly, namespace)
}

impl DotnetDocHelper {
    fn type_string(&self, package: &str, ctx: &ModuleContext, ty: &Type, input: bool) -> String {
        match ty {
            Type::Any => "object".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Number => "double".to_string(),
            Type::String => "string".to_string(),
            Type::List(el) => {
                let inner = self.type_string(package, ctx, el, input);
                if input {
                    format!("InputList<{}>", inner)
                } else {
                    format!("ImmutableArray<{}>", inner)
                }
            }
            Type::Map(el) => {
                let inner = self.type_string(package, ctx, el, input);
                if input {
                    format!("InputMap<{}>", inner)
                } else {
                    format!("ImmutableDictionary<string, {}>", inner)
                }
            }
            Type::Object(obj) => {
                let Some(r) = object_ref(obj.token.as_deref(), ctx) else {
                    return "ImmutableDictionary<string, object>".to_string();
                };
                let local = if obj.kind != ObjectKind::Plain {
                    r.name.to_string()
                } else if input {
                    format!("Inputs.{}Args", r.name)
                } else {
                    format!("Outputs.{}", r.name)
                };
                match r.module {
                    None => local,
                    Some(m) => format!("{}.{}", namespace(package, m).1, local),
                }
            }
        }
    }
}

impl DocLanguageHelper for DotnetDocHelper {
    fn language(&self) -> Language {
        Language::Dotnet
    }

    fn resource_type_doc_link(&self, package: &str, module: &str, type_name: &str) -> String {
        let (assembly, namespace) = namespace(package, module);
        format!(
            "{}/{}/{}.{}.html",
            DOC_ROOT,
            assembly,
            namespace,
            normalize_type_name(type_name)
        )
    }

    fn resource_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let (assembly, namespace) = namespace(package, module);
        let name = normalize_type_name(type_name);
        if input {
            format!("{}/{}/{}.Inputs.{}Args.html", DOC_ROOT, assembly, namespace, name)
        } else {
            format!("{}/{}/{}.Outputs.{}.html", DOC_ROOT, assembly, namespace, name)
        }
    }

    fn function_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let (assembly, namespace) = namespace(package, module);
        let suffix = if input { "Args" } else { "Result" };
        format!(
            "{}/{}/{}.{}{}.html",
            DOC_ROOT,
            assembly,
            namespace,
            normalize_type_name(type_name),
            suffix
        )
    }

    fn builtin_type_doc_link(&self, type_name: &str) -> String {
        format!(
            "https://docs.microsoft.com/en-us/dotnet/api/system.{}",
            type_name.to_lowercase()
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
        let nullable = matches!(ty, Type::Bool | Type::Int | Type::Number | Type::String | Type::Object(_));
        Ok(if optional && nullable {
            format!("{}?", rendered)
        } else {
            rendered
        })
    }

    fn property_name(&self, name: &str) -> String {
        title_case(name)
    }

    fn resource_lookup_result_name(&self, resource_name: &str) -> String {
        format!("Get{}Result", resource_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::aws_package;

    #[test]
    fn test_ib014_doc_links() {
        let d = DotnetDocHelper;
        assert_eq!(
            d.resource_type_doc_link("aws", "s3", "Bucket"),
            "/docs/reference/pkg/dotnet/Pulumi.Aws/Pulumi.Aws.S3.Bucket.html"
        );
        assert_eq!(
            d.resource_type_doc_link("pulumi", "", "CustomResourceOptions"),
            "/docs/reference/pkg/dotnet/Pulumi/Pulumi.CustomResourceOptions.html"
        );
        assert_eq!(
            d.resource_type_doc_link("azure-native", "storage", "*storage.Account"),
            "/docs/reference/pkg/dotnet/Pulumi.AzureNative/Pulumi.AzureNative.Storage.Account.html"
        );
        assert_eq!(
            d.resource_io_doc_link("aws", "s3", "BucketCorsRule", true),
            "/docs/reference/pkg/dotnet/Pulumi.Aws/Pulumi.Aws.S3.Inputs.BucketCorsRuleArgs.html"
        );
        assert_eq!(
            d.resource_io_doc_link("aws", "s3", "BucketCorsRule", false),
            "/docs/reference/pkg/dotnet/Pulumi.Aws/Pulumi.Aws.S3.Outputs.BucketCorsRule.html"
        );
        assert_eq!(
            d.function_io_doc_link("aws", "s3", "GetBucket", false),
            "/docs/reference/pkg/dotnet/Pulumi.Aws/Pulumi.Aws.S3.GetBucketResult.html"
        );
    }

    #[test]
    fn test_ib014_naming() {
        let d = DotnetDocHelper;
        assert_eq!(d.property_name("forceDestroy"), "ForceDestroy");
        assert_eq!(d.resource_lookup_result_name("Bucket"), "GetBucketResult");
        assert_eq!(d.builtin_type_doc_link("String"), "https://docs.microsoft.com/en-us/dotnet/api/system.string");
    }

    #[test]
    fn test_ib014_type_strings() {
        let d = DotnetDocHelper;
        let package = aws_package();
        let contexts = d.generate_module_contexts(&package);
        let rule = &package.types["aws:s3/BucketCorsRule:BucketCorsRule"];
        let render = |module: &str, ty: &Type, input: bool, optional: bool| {
            d.language_type_string(&contexts, module, ty, input, optional).unwrap()
        };
        assert_eq!(render("s3", &Type::Int, false, true), "int?");
        assert_eq!(render("s3", &Type::list(Type::String), true, true), "InputList<string>");
        assert_eq!(
            render("s3", &Type::map(Type::Number), false, false),
            "ImmutableDictionary<string, double>"
        );
        assert_eq!(render("s3", &Type::list(rule.clone()), true, false), "InputList<Inputs.BucketCorsRuleArgs>");
        assert_eq!(render("", rule, false, false), "Pulumi.Aws.S3.Outputs.BucketCorsRule");
    }
}
