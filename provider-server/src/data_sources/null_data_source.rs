use tfengine::{AttributeBuilder, AttributeType, Block, BlockBuilder};

/// Data source that echoes its inputs back as outputs
pub struct NullDataSource;

impl NullDataSource {
    pub fn schema_static() -> Block {
        BlockBuilder::new()
            .attribute(
                AttributeBuilder::map("inputs", AttributeType::String)
                    .description("Values passed through to outputs")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::map("outputs", AttributeType::String)
                    .description("Copy of inputs")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("random")
                    .description("Random value generated on each read")
                    .computed()
                    .build(),
            )
            .attribute(AttributeBuilder::string("id").computed().build())
            .build()
    }
}
