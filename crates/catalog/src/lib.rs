//! Static quiz catalog
//!
//! The ordered set of questions the bot can ask. Loaded once at process
//! start (built-in default or a YAML file) and read-only at runtime.

pub mod step;

pub use step::{QuestionType, QuizOption, QuizStep};

use leadbot_config::constants::{DESCRIPTION_MAX_LENGTH, PROGRESS_PREFIX, TITLE_MAX_LENGTH};
use leadbot_text_processing::truncate_for_menu;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Catalog is empty")]
    Empty,

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),
}

/// One rendered row of the progress menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// The ordered quiz catalog. Insertion order is presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizCatalog {
    steps: Vec<QuizStep>,
}

impl QuizCatalog {
    /// Build from an explicit step list, rejecting duplicates.
    pub fn new(steps: Vec<QuizStep>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.clone()) {
                return Err(CatalogError::DuplicateStep(step.id.clone()));
            }
        }
        Ok(Self { steps })
    }

    /// Load a catalog from a YAML file (a sequence of steps).
    pub fn load(path: &str) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_string(),
            source,
        })?;
        let steps: Vec<QuizStep> =
            serde_yaml::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_string(),
                source,
            })?;
        let catalog = Self::new(steps)?;
        tracing::info!(path = %path, steps = catalog.steps.len(), "Loaded quiz catalog");
        Ok(catalog)
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&QuizStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// All steps, in catalog order.
    pub fn steps(&self) -> &[QuizStep] {
        &self.steps
    }

    /// Identifier of the first step (the natural quiz entry point).
    pub fn first_step_id(&self) -> &str {
        &self.steps[0].id
    }

    /// A step counts as answered only when a stored value exists and is not
    /// the step's own identifier (guards against half-written placeholders).
    pub fn is_answered(&self, step_id: &str, responses: &HashMap<String, String>) -> bool {
        responses
            .get(step_id)
            .is_some_and(|answer| !answer.is_empty() && answer.as_str() != step_id)
    }

    /// Steps not yet answered, in catalog order.
    pub fn remaining_steps(&self, responses: &HashMap<String, String>) -> Vec<&QuizStep> {
        self.steps
            .iter()
            .filter(|s| !self.is_answered(&s.id, responses))
            .collect()
    }

    /// Resolve a stored raw answer to display text: for `options` steps the
    /// selected choice's title (raw id as fallback), for `text` steps the
    /// raw text itself.
    pub fn readable_answer(&self, step_id: &str, raw_answer: &str) -> String {
        match self.step(step_id) {
            Some(step) if step.question_type == QuestionType::Options => step
                .option(raw_answer)
                .map(|o| o.title.clone())
                .unwrap_or_else(|| raw_answer.to_string()),
            _ => raw_answer.to_string(),
        }
    }

    /// Render the progress menu: one row per step, decorated with the
    /// completion marker and a truncated answer preview where a response
    /// exists, within the platform's title/description limits.
    pub fn menu_rows(&self, responses: &HashMap<String, String>) -> Vec<MenuRow> {
        self.steps
            .iter()
            .map(|step| {
                let answered = self.is_answered(&step.id, responses);

                let title = if answered {
                    truncate_for_menu(&step.title, TITLE_MAX_LENGTH, PROGRESS_PREFIX)
                } else {
                    truncate_for_menu(&step.title, TITLE_MAX_LENGTH, "")
                };

                let description = if answered {
                    let readable = self.readable_answer(&step.id, &responses[&step.id]);
                    truncate_for_menu(
                        &format!("Sua resposta: {readable}"),
                        DESCRIPTION_MAX_LENGTH,
                        "",
                    )
                } else {
                    truncate_for_menu(
                        &format!("Pergunta: {}", step.question),
                        DESCRIPTION_MAX_LENGTH,
                        "",
                    )
                };

                MenuRow {
                    id: step.id.clone(),
                    title,
                    description,
                }
            })
            .collect()
    }
}

/// Built-in catalog for the website briefing flow.
impl Default for QuizCatalog {
    fn default() -> Self {
        let steps = vec![
            QuizStep {
                id: "q1".into(),
                title: "Objetivo do site".into(),
                question: "Qual é o principal objetivo do seu site?".into(),
                question_type: QuestionType::Options,
                options: vec![
                    QuizOption {
                        id: "q1_vendas".into(),
                        title: "Vender produtos".into(),
                        description: None,
                    },
                    QuizOption {
                        id: "q1_leads".into(),
                        title: "Gerar leads".into(),
                        description: None,
                    },
                    QuizOption {
                        id: "q1_portfolio".into(),
                        title: "Portfólio ou Instit.".into(),
                        description: None,
                    },
                ],
            },
            QuizStep {
                id: "q2".into(),
                title: "Conteúdo pronto".into(),
                question: "Você já tem os textos e imagens para o site?".into(),
                question_type: QuestionType::Options,
                options: vec![
                    QuizOption {
                        id: "q2_sim".into(),
                        title: "Sim, tudo pronto".into(),
                        description: None,
                    },
                    QuizOption {
                        id: "q2_parcial".into(),
                        title: "Tenho alguma coisa".into(),
                        description: None,
                    },
                    QuizOption {
                        id: "q2_nao".into(),
                        title: "Não, preciso de ajuda".into(),
                        description: None,
                    },
                ],
            },
            QuizStep {
                id: "q3".into(),
                title: "Funcionalidades".into(),
                question: "Quais funcionalidades extras você precisa? (Selecione a principal)"
                    .into(),
                question_type: QuestionType::Options,
                // More than 3 options: always rendered as a list, so the
                // descriptions are visible.
                options: vec![
                    QuizOption {
                        id: "q3_blog".into(),
                        title: "Blog e Notícias".into(),
                        description: Some(
                            "Área para artigos, SEO e conteúdo recorrente.".into(),
                        ),
                    },
                    QuizOption {
                        id: "q3_ecommerce".into(),
                        title: "Loja Virtual".into(),
                        description: Some(
                            "Venda de produtos/serviços com checkout e pagamento.".into(),
                        ),
                    },
                    QuizOption {
                        id: "q3_agendamento".into(),
                        title: "Agendamentos/Reservas".into(),
                        description: Some(
                            "Sistema para clientes marcarem horários online.".into(),
                        ),
                    },
                    QuizOption {
                        id: "q3_membros".into(),
                        title: "Área de Membros".into(),
                        description: Some(
                            "Conteúdo exclusivo, login e controle de acesso.".into(),
                        ),
                    },
                ],
            },
            QuizStep {
                id: "q4".into(),
                title: "Prazo".into(),
                question: "Certo! E qual é o seu prazo ideal para o lançamento do site?".into(),
                question_type: QuestionType::Text,
                options: vec![],
            },
            QuizStep {
                id: "q5".into(),
                title: "Inspirações".into(),
                question: "Me envie até 3 links de sites que você gosta (mesmo que de outro ramo)."
                    .into(),
                question_type: QuestionType::Text,
                options: vec![],
            },
            QuizStep {
                id: "q6".into(),
                title: "Orçamento".into(),
                question: "Qual é a sua faixa de orçamento estimada para este projeto?".into(),
                question_type: QuestionType::Options,
                options: vec![
                    QuizOption {
                        id: "q6_a".into(),
                        title: "Até R$ 2.000".into(),
                        description: None,
                    },
                    QuizOption {
                        id: "q6_b".into(),
                        title: "R$ 2.000 a R$ 5.000".into(),
                        description: None,
                    },
                    QuizOption {
                        id: "q6_c".into(),
                        title: "Acima de R$ 5.000".into(),
                        description: None,
                    },
                ],
            },
        ];

        Self { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_catalog_is_ordered() {
        let catalog = QuizCatalog::default();
        let ids: Vec<_> = catalog.steps().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3", "q4", "q5", "q6"]);
        assert_eq!(catalog.first_step_id(), "q1");
    }

    #[test]
    fn test_step_lookup() {
        let catalog = QuizCatalog::default();
        assert!(catalog.step("q3").is_some());
        assert!(catalog.step("q9").is_none());
    }

    #[test]
    fn test_is_answered_rejects_placeholder_values() {
        let catalog = QuizCatalog::default();
        assert!(!catalog.is_answered("q1", &responses(&[])));
        assert!(!catalog.is_answered("q1", &responses(&[("q1", "")])));
        // A value equal to the step's own id is a half-written placeholder.
        assert!(!catalog.is_answered("q1", &responses(&[("q1", "q1")])));
        assert!(catalog.is_answered("q1", &responses(&[("q1", "q1_vendas")])));
    }

    #[test]
    fn test_remaining_steps_in_order() {
        let catalog = QuizCatalog::default();
        let remaining =
            catalog.remaining_steps(&responses(&[("q1", "q1_vendas"), ("q4", "2 meses")]));
        let ids: Vec<_> = remaining.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["q2", "q3", "q5", "q6"]);
    }

    #[test]
    fn test_readable_answer_resolves_option_title() {
        let catalog = QuizCatalog::default();
        assert_eq!(
            catalog.readable_answer("q1", "q1_vendas"),
            "Vender produtos"
        );
        // Unknown option id falls back to the raw identifier.
        assert_eq!(catalog.readable_answer("q1", "q1_xyz"), "q1_xyz");
        // Text steps carry the readable value already.
        assert_eq!(catalog.readable_answer("q4", "2 meses"), "2 meses");
        // Unknown step: raw value unchanged.
        assert_eq!(catalog.readable_answer("q9", "algo"), "algo");
    }

    #[test]
    fn test_menu_rows_mark_answered_steps() {
        let catalog = QuizCatalog::default();
        let rows = catalog.menu_rows(&responses(&[("q1", "q1_vendas")]));

        assert_eq!(rows.len(), 6);
        assert!(rows[0].title.starts_with("✅ "));
        assert!(rows[0].description.starts_with("Sua resposta: Vender"));
        assert!(!rows[1].title.starts_with("✅ "));
        assert!(rows[1].description.starts_with("Pergunta: "));
    }

    #[test]
    fn test_menu_rows_respect_display_limits() {
        let catalog = QuizCatalog::default();
        let all_answered = responses(&[
            ("q1", "q1_portfolio"),
            ("q2", "q2_nao"),
            ("q3", "q3_agendamento"),
            ("q4", "um prazo extremamente detalhado e longo demais para caber na descrição"),
            ("q5", "https://exemplo.com/um https://exemplo.com/dois https://exemplo.com/tres"),
            ("q6", "q6_b"),
        ]);

        for row in catalog.menu_rows(&all_answered) {
            assert!(row.title.chars().count() <= TITLE_MAX_LENGTH, "{}", row.title);
            assert!(
                row.description.chars().count() <= DESCRIPTION_MAX_LENGTH,
                "{}",
                row.description
            );
        }
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let mut steps = QuizCatalog::default().steps().to_vec();
        steps.push(steps[0].clone());
        assert!(matches!(
            QuizCatalog::new(steps),
            Err(CatalogError::DuplicateStep(_))
        ));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(QuizCatalog::new(vec![]), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_yaml_round_trip() {
        let catalog = QuizCatalog::default();
        let yaml = serde_yaml::to_string(catalog.steps()).unwrap();
        let parsed: Vec<QuizStep> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, catalog.steps());
    }
}
