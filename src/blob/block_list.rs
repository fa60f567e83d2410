//! Put Block List request body

use super::block_id::BlockId;
use super::BlobClientError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Ordered list of staged blocks that make up the final blob.
///
/// Every entry is emitted as `<Latest>`, so the service picks the most
/// recently staged copy of a block that was re-sent during a retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    blocks: Vec<BlockId>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: BlockId) {
        self.blocks.push(id);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn ids(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Serialize to the XML body expected by `comp=blocklist`
    pub fn to_xml(&self) -> Result<String, BlobClientError> {
        let mut writer = Writer::new(Vec::with_capacity(64 + self.blocks.len() * 26));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(serialization_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("BlockList")))
            .map_err(serialization_error)?;
        for id in &self.blocks {
            writer
                .write_event(Event::Start(BytesStart::new("Latest")))
                .map_err(serialization_error)?;
            writer
                .write_event(Event::Text(BytesText::new(id.as_str())))
                .map_err(serialization_error)?;
            writer
                .write_event(Event::End(BytesEnd::new("Latest")))
                .map_err(serialization_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("BlockList")))
            .map_err(serialization_error)?;

        String::from_utf8(writer.into_inner()).map_err(serialization_error)
    }
}

fn serialization_error<E: std::fmt::Display>(e: E) -> BlobClientError {
    BlobClientError::InvalidRequest(format!("block list serialization: {}", e))
}

impl From<Vec<BlockId>> for BlockList {
    fn from(blocks: Vec<BlockId>) -> Self {
        Self { blocks }
    }
}
