//! Core domain types for code-cognitio.

mod chunk;

pub use chunk::{
    ArgPattern, BaseImage, CallPattern, CallableInfo, Chunk, ChunkKind, ChunkPayload, ClassInfo,
    CodeBlockInfo, CodeContext, ComponentInfo, ContentType, DirectiveInfo, DockerInstruction,
    EnvVar, Import, ImportKind, ModuleInfo, Param, RelationKind, Relationship, SectionInfo,
    SectionType, UsageStats,
};
