//! IB-011: Go descriptors (pkg.go.dev links, Go type spelling).

use super::{
    normalize_type_name, object_ref, title_case, DescriptorError, DocLanguageHelper, Language, ModuleContext,
    ModuleContexts,
};
use crate::core::types::{ObjectKind, Type};

/// Go adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoDocHelper;

impl GoDocHelper {
    fn plain_type(&self, package: &str, ctx: &ModuleContext, ty: &Type, input: bool, optional: bool) -> String {
        let pointer = if optional { "*" } else { "" };
        match ty {
            Type::Any => "interface{}".to_string(),
            Type::Bool => format!("{}bool", pointer),
            Type::Int => format!("{}int", pointer),
            Type::Number => format!("{}float64", pointer),
            Type::String => format!("{}string", pointer),
            Type::List(el) => format!("[]{}", self.plain_type(package, ctx, el, input, false)),
            Type::Map(el) => format!("map[string]{}", self.plain_type(package, ctx, el, input, false)),
            Type::Object(obj) => {
                let Some(r) = object_ref(obj.token.as_deref(), ctx) else {
                    return "map[string]interface{}".to_string();
                };
                let name = if input && obj.kind == ObjectKind::Plain {
                    format!("{}Args", r.name)
                } else {
                    r.name.to_string()
                };
                let qualified = match r.module {
                    None => name,
                    Some("") => format!("{}.{}", package, name),
                    Some(m) => format!("{}.{}", m, name),
                };
                if obj.kind == ObjectKind::Plain {
                    format!("{}{}", pointer, qualified)
                } else {
                    format!("*{}", qualified)
                }
            }
        }
    }
}

impl DocLanguageHelper for GoDocHelper {
    fn language(&self) -> Language {
        Language::Go
    }

    fn resource_type_doc_link(&self, package: &str, module: &str, type_name: &str) -> String {
        let type_name = normalize_type_name(type_name);
        if package.is_empty() {
            return format!(
                "https://pkg.go.dev/github.com/pulumi/pulumi/sdk/go/{}?tab=doc#{}",
                module, type_name
            );
        }
        format!(
            "https://pkg.go.dev/github.com/pulumi/pulumi-{}/sdk/go/{}/{}?tab=doc#{}",
            package, package, module, type_name
        )
    }

    fn resource_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let link = self.resource_type_doc_link(package, module, type_name);
        if input {
            link + "Args"
        } else {
            link + "Output"
        }
    }

    fn function_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String {
        let link = self.resource_type_doc_link(package, module, type_name);
        if input {
            link + "Args"
        } else {
            link
        }
    }

    fn builtin_type_doc_link(&self, type_name: &str) -> String {
        format!("https://golang.org/pkg/builtin/#{}", type_name)
    }

    fn language_type_string(
        &self,
        contexts: &ModuleContexts,
        module: &str,
        ty: &Type,
        input: bool,
        optional: bool,
    ) -> Result<String, DescriptorError> {
        // The kubernetes root module is generated as the `providers` package.
        let module = if module.is_empty() && contexts.package == "kubernetes" {
            "providers"
        } else {
            module
        };
        let ctx = contexts.require(module, ty)?;
        Ok(self.plain_type(&contexts.package, ctx, ty, input, optional))
    }

    fn property_name(&self, name: &str) -> String {
        title_case(name)
    }

    fn resource_lookup_result_name(&self, resource_name: &str) -> String {
        format!("Lookup{}Result", resource_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::aws_package;
    use crate::core::types::ObjectKind;
    use indexmap::IndexMap;

    fn cors_rule() -> Type {
        let package = aws_package();
        package.types["aws:s3/BucketCorsRule:BucketCorsRule"].clone()
    }

    #[test]
    fn test_ib011_resource_doc_link() {
        let d = GoDocHelper;
        assert_eq!(
            d.resource_type_doc_link("aws", "s3", "Bucket"),
            "https://pkg.go.dev/github.com/pulumi/pulumi-aws/sdk/go/aws/s3?tab=doc#Bucket"
        );
        assert_eq!(
            d.resource_type_doc_link("", "pulumi", "*pulumi.CustomResourceOptions"),
            "https://pkg.go.dev/github.com/pulumi/pulumi/sdk/go/pulumi?tab=doc#CustomResourceOptions"
        );
    }

    #[test]
    fn test_ib011_io_doc_links() {
        let d = GoDocHelper;
        let base = "https://pkg.go.dev/github.com/pulumi/pulumi-aws/sdk/go/aws/s3?tab=doc#BucketCorsRule";
        assert_eq!(d.resource_io_doc_link("aws", "s3", "BucketCorsRule", true), format!("{}Args", base));
        assert_eq!(d.resource_io_doc_link("aws", "s3", "BucketCorsRule", false), format!("{}Output", base));
        assert_eq!(d.function_io_doc_link("aws", "s3", "BucketCorsRule", true), format!("{}Args", base));
        assert_eq!(d.function_io_doc_link("aws", "s3", "BucketCorsRule", false), base);
        assert_eq!(d.builtin_type_doc_link("string"), "https://golang.org/pkg/builtin/#string");
    }

    #[test]
    fn test_ib011_naming() {
        let d = GoDocHelper;
        assert_eq!(d.property_name("forceDestroy"), "ForceDestroy");
        assert_eq!(d.resource_lookup_result_name("Bucket"), "LookupBucketResult");
    }

    #[test]
    fn test_ib011_type_strings() {
        let d = GoDocHelper;
        let contexts = d.generate_module_contexts(&aws_package());
        let render = |module: &str, ty: &Type, input: bool, optional: bool| {
            d.language_type_string(&contexts, module, ty, input, optional).unwrap()
        };
        assert_eq!(render("s3", &Type::String, false, false), "string");
        assert_eq!(render("s3", &Type::Bool, false, true), "*bool");
        assert_eq!(render("s3", &Type::map(Type::Number), false, true), "map[string]float64");
        assert_eq!(render("s3", &Type::Any, false, false), "interface{}");
        assert_eq!(render("s3", &Type::list(cors_rule()), true, false), "[]BucketCorsRuleArgs");
        assert_eq!(render("s3", &cors_rule(), false, true), "*BucketCorsRule");
        assert_eq!(render("", &cors_rule(), false, false), "s3.BucketCorsRule");
        let inline = Type::object(None, ObjectKind::Plain, IndexMap::new());
        assert_eq!(render("s3", &inline, false, false), "map[string]interface{}");
    }

    #[test]
    fn test_ib011_resource_references() {
        let d = GoDocHelper;
        let package = aws_package();
        let contexts = d.generate_module_contexts(&package);
        let bucket = &package.resources["aws:s3/bucket:Bucket"].output_type;
        let instance = &package.resources["aws:index/instance:Instance"].output_type;
        assert_eq!(d.language_type_string(&contexts, "s3", bucket, false, false).unwrap(), "*Bucket");
        assert_eq!(d.language_type_string(&contexts, "s3", instance, true, false).unwrap(), "*aws.Instance");
    }

    #[test]
    fn test_ib011_missing_module_context() {
        let d = GoDocHelper;
        let contexts = d.generate_module_contexts(&aws_package());
        let err = d
            .language_type_string(&contexts, "ec2", &Type::String, false, false)
            .unwrap_err();
        assert!(err.to_string().contains("no module context for module \"ec2\""));
    }
}
