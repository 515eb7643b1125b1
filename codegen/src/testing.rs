use tsoap_wsdl::{
    loader::MemoryLoader, namespaces::NamespaceScope, parse_document, schema::SchemaBuilder,
    types::SchemaRegistry, Url,
};

pub fn registry(schemas: &[&str]) -> SchemaRegistry {
    let loader = MemoryLoader::new();
    let mut builder = SchemaBuilder::new(&loader);
    let base = Url::parse("http://example.test/schema.xsd").unwrap();

    for schema in schemas {
        let node = parse_document(schema).unwrap();
        builder
            .add_schema(&node, &NamespaceScope::default(), &base)
            .unwrap();
    }

    builder.finish().unwrap()
}
