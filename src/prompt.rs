//! Prompt template for answer generation
//!
//! The template instructs the model to answer strictly from the retrieved
//! context and to refuse anything the context does not cover.

use crate::types::RetrievedChunk;

/// Refusal line the model is instructed to emit for out-of-context questions
pub const OUT_OF_CONTEXT_ANSWER: &str =
    "Não tenho informações necessárias para responder sua pergunta.";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk contents into the context block
    pub fn build_context(results: &[RetrievedChunk]) -> String {
        results
            .iter()
            .map(|result| result.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render the full prompt for a question and its retrieved context
    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            r#"
CONTEXTO:
{contexto}

REGRAS:
- Responda somente com base no CONTEXTO.
- Se a informação não estiver explicitamente no CONTEXTO, responda:
  "Não tenho informações necessárias para responder sua pergunta."
- Nunca invente ou use conhecimento externo.
- Nunca produza opiniões ou interpretações além do que está escrito.

EXEMPLOS DE PERGUNTAS FORA DO CONTEXTO:
Pergunta: "Qual é a capital da França?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

Pergunta: "Quantos clientes temos em 2024?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

Pergunta: "Você acha isso bom ou ruim?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

PERGUNTA DO USUÁRIO:
{pergunta}

RESPONDA A "PERGUNTA DO USUÁRIO"
"#,
            contexto = context,
            pergunta = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn retrieved(content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: "test.pdf".to_string(),
                page: Some(1),
                chunk_index: 0,
            },
            distance: 0.1,
        }
    }

    #[test]
    fn test_context_joins_chunks_in_order() {
        let results = vec![retrieved("primeiro trecho"), retrieved("segundo trecho")];
        assert_eq!(
            PromptBuilder::build_context(&results),
            "primeiro trecho\n\nsegundo trecho"
        );
    }

    #[test]
    fn test_context_of_no_results_is_empty() {
        assert_eq!(PromptBuilder::build_context(&[]), "");
    }

    #[test]
    fn test_prompt_embeds_context_and_question() {
        let prompt = PromptBuilder::build_prompt(
            "Qual o faturamento da empresa?",
            "O faturamento foi de 10 milhões de reais.",
        );

        assert!(prompt.starts_with("\nCONTEXTO:\nO faturamento foi de 10 milhões de reais.\n"));
        assert!(prompt.contains("PERGUNTA DO USUÁRIO:\nQual o faturamento da empresa?\n"));
        assert!(prompt.contains(OUT_OF_CONTEXT_ANSWER));
        assert!(prompt.ends_with("RESPONDA A \"PERGUNTA DO USUÁRIO\"\n"));
    }

    #[test]
    fn test_prompt_renders_with_empty_context() {
        let prompt = PromptBuilder::build_prompt("Qual é a capital da França?", "");
        assert!(prompt.starts_with("\nCONTEXTO:\n\n\nREGRAS:"));
        assert!(prompt.contains("Qual é a capital da França?"));
    }
}
