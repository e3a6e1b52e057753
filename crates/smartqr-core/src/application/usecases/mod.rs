//! Use cases: transport-facing entry points with stable envelopes.

pub mod generate_smart_qr;

pub use generate_smart_qr::{
    GenerateData, GenerateOptions, GenerateSmartQrRequest, GenerateSmartQrResponse,
    GenerateSmartQrUseCase, ResponseMetadata, codes,
};
