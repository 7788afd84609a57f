// Standardized error codes returned in API error bodies

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_AUDIO: &str = "VALIDATION_1003";
    pub const PAYLOAD_TOO_LARGE: &str = "VALIDATION_1004";
    pub const INVALID_DOCUMENT: &str = "VALIDATION_1005";
}

pub mod upstream {
    pub const AUTHENTICATION_FAILED: &str = "UPSTREAM_2001";
    pub const PROVIDER_ERROR: &str = "UPSTREAM_2002";
    pub const TIMEOUT: &str = "UPSTREAM_2003";
    pub const NETWORK: &str = "UPSTREAM_2004";
}

pub mod system {
    pub const CONFIGURATION: &str = "SYSTEM_5001";
    pub const STARTUP: &str = "SYSTEM_5002";
    pub const INTERNAL: &str = "SYSTEM_5003";
}

/// Codes for failures tagged with the consultation pipeline stage they came from
pub mod pipeline {
    pub const AUDIO_VALIDATION: &str = "PIPELINE_3001";
    pub const UPLOAD: &str = "PIPELINE_3002";
    pub const BUCKET_PROVISIONING: &str = "PIPELINE_3003";
    pub const RECOGNIZER_LOOKUP: &str = "PIPELINE_3004";
    pub const RECOGNIZER_CREATION: &str = "PIPELINE_3005";
    pub const BATCH_RECOGNITION: &str = "PIPELINE_3006";
    pub const DIARIZATION: &str = "PIPELINE_3007";
    pub const NOTE_GENERATION: &str = "PIPELINE_3008";
    pub const INSIGHT_GENERATION: &str = "PIPELINE_3009";
    pub const PRESCRIPTION_DRAFTING: &str = "PIPELINE_3010";
    pub const TRANSLATION: &str = "PIPELINE_3011";
    pub const QUESTION_ANSWERING: &str = "PIPELINE_3012";
    pub const DOCUMENT_EXTRACTION: &str = "PIPELINE_3013";

    /// Code for a stage name as reported by the pipeline (`snake_case`)
    pub fn for_stage(stage: &str) -> Option<&'static str> {
        let code = match stage {
            "audio_validation" => AUDIO_VALIDATION,
            "upload" => UPLOAD,
            "bucket_provisioning" => BUCKET_PROVISIONING,
            "recognizer_lookup" => RECOGNIZER_LOOKUP,
            "recognizer_creation" => RECOGNIZER_CREATION,
            "batch_recognition" => BATCH_RECOGNITION,
            "diarization" => DIARIZATION,
            "note_generation" => NOTE_GENERATION,
            "insight_generation" => INSIGHT_GENERATION,
            "prescription_drafting" => PRESCRIPTION_DRAFTING,
            "translation" => TRANSLATION,
            "question_answering" => QUESTION_ANSWERING,
            "document_extraction" => DOCUMENT_EXTRACTION,
            _ => return None,
        };
        Some(code)
    }
}
