//! Face-match prompt construction.

use snapfind_core::{CandidatePhoto, EncodedImage, OraclePrompt, ReferenceImage};

/// Task instruction sent with every batch.
pub const FACE_MATCH_INSTRUCTION: &str = "You are a face matching assistant. \
The first image is a reference photo of a person. Each following image is a candidate \
photo, introduced by a line of the form \"ID: <id>\". Identify which candidate photos \
show the same person as the reference photo. Respond only with a JSON object of the \
form {\"matchedIds\": [\"<id>\", ...]} listing the IDs of the matching candidates. \
If no candidate matches, respond with {\"matchedIds\": []}.";

/// Prefix of the text part that introduces each candidate image.
pub const CANDIDATE_LABEL: &str = "ID: ";

/// Build one batch prompt: reference image, then `ID: <id>` and its image per candidate.
pub fn face_match_prompt(
    reference: &ReferenceImage,
    candidates: &[(&CandidatePhoto, EncodedImage)],
) -> OraclePrompt {
    candidates.iter().fold(
        OraclePrompt::new(FACE_MATCH_INSTRUCTION)
            .with_json_response()
            .image(reference.as_encoded()),
        |prompt, (photo, image)| {
            prompt
                .text(format!("{}{}", CANDIDATE_LABEL, photo.id))
                .image(image.clone())
        },
    )
}

/// Candidate IDs a prompt introduces, in order.
pub fn candidate_ids(prompt: &OraclePrompt) -> Vec<String> {
    prompt
        .texts()
        .filter_map(|t| t.strip_prefix(CANDIDATE_LABEL))
        .map(str::to_string)
        .collect()
}
