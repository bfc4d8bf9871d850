//! Enrichment prompt templates.
//!
//! The model is asked to expand a craft-demonstration transcript with the
//! gestures involved, common mistakes, and expert tips, as plain text.

use std::str::FromStr;

/// Sequences that end a completion early.
pub const STOP_SEQUENCES: [&str; 2] = ["\n\nOriginal Transcript:", "\n\n---"];

/// Language the enrichment is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptLanguage {
    #[default]
    French,
    English,
}

impl FromStr for PromptLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" | "french" => Ok(PromptLanguage::French),
            "en" | "english" => Ok(PromptLanguage::English),
            other => Err(format!("unsupported prompt language '{other}', expected fr or en")),
        }
    }
}

const SYSTEM_FR: &str = "\
Vous êtes un expert en analyse des techniques de soufflage de verre. Votre tâche consiste à \
enrichir les transcriptions de démonstrations de soufflage de verre avec des informations \
contextuelles pertinentes.
Vous répondez formellement.
Basé sur la transcription fournie, ajoutez :
1. Informations sur les gestes pertinents (positions des mains, mouvements du corps)
2. Erreurs courantes lors de l'exécution de l'action décrite
3. Conseils d'experts pour une technique appropriée

Directives :
- Gardez la version étendue conversationnelle et fluide
- Restez étroitement aligné avec le contexte de la transcription
- N'ajoutez pas d'informations excessives ou non pertinentes
- Soyez spécifique concernant les outils, mouvements et techniques
- Mentionnez la position du corps, l'application de la force et la précision quand c'est pertinent
- Gardez la forme du texte concise et ciblée
- Évitez les répétitions inutiles
- Le texte doit être en français
- Utiliser que du texte brut, sans markdown ni balises HTML
- S'il n'y a pas assez d'informations dans la transcription pour ajouter des détails \
pertinents, répondre de manière très concise.

Le domaine de la tâche est : Soufflage de verre";

const SYSTEM_EN: &str = "\
You are an expert in analysing glassblowing techniques. Your task is to enrich transcripts of \
glassblowing demonstrations with relevant contextual information.
Answer formally.
Based on the transcript provided, add:
1. Information about the relevant gestures (hand positions, body movements)
2. Common mistakes made while performing the described action
3. Expert tips for proper technique

Guidelines:
- Keep the extended version conversational and fluent
- Stay closely aligned with the context of the transcript
- Do not add excessive or irrelevant information
- Be specific about tools, movements and techniques
- Mention body position, application of force and precision where relevant
- Keep the text concise and focused
- Avoid unnecessary repetition
- Write in English
- Use plain text only, no markdown or HTML tags
- If the transcript does not contain enough information to add relevant details, answer \
very briefly.

The task domain is: Glassblowing";

/// Full completion prompt for `transcription`.
pub fn build_prompt(language: PromptLanguage, transcription: &str) -> String {
    match language {
        PromptLanguage::French => format!(
            "{SYSTEM_FR}\n\nTranscription originale:\n\"{transcription}\"\n\n\
             Transcription étendue (ajouter des détails sur les gestes, les erreurs courantes \
             et les conseils d'experts):"
        ),
        PromptLanguage::English => format!(
            "{SYSTEM_EN}\n\nOriginal transcript:\n\"{transcription}\"\n\n\
             Extended transcript (add details on gestures, common mistakes and expert tips):"
        ),
    }
}
