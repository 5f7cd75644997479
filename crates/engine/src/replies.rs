//! Outbound reply copy (pt-BR)

pub const FALLBACK_BODY: &str = "Não entendi 🤔. Por favor, escolha uma das opções abaixo:";
pub const FALLBACK_BUTTON_TITLE: &str = "Criar site";

pub const COMPLETION_BODY: &str = "🎉 Perfeito! Recebemos todas as informações do seu projeto.\n\nEstou transferindo você para a fila de atendimento prioritária. Um de nossos consultores analisará suas respostas e falará com você em instantes! 👨‍💻";

pub const ONE_REMAINING_BODY: &str = "💡 Falta apenas mais uma...";

pub const ANSWER_SAVED_BODY: &str = "✅ Resposta salva!";
pub const ANSWER_NOTED_BODY: &str = "✅ Resposta anotada!";

pub const INVALID_OPTION_BODY: &str =
    "❌ Opção inválida. Por favor, selecione uma das opções abaixo:";
pub const STEP_ERROR_BODY: &str =
    "🚨 Desculpe, houve um erro. Por favor, selecione uma etapa do menu principal.";

pub const TRANSFER_BODY: &str = "Entendido! Vou chamar um de nossos consultores para analisar o que você já respondeu e te ajudar.\n\nAguarde um momento.";

pub const SITE_MENU_BODY: &str = "Escolha uma opção sobre Criar site:";
pub const SITE_INFO_TITLE: &str = "Mais informações";
pub const SITE_SUPPORT_TITLE: &str = "Falar com suporte";
pub const SITE_INFO_BODY: &str = "Aqui estão mais informações sobre Criar site...";

pub const EXIT_OPTION_TITLE: &str = "Falar com consultor";
pub const EXIT_OPTION_DESCRIPTION: &str = "Encerrar quiz e pedir atendimento humano";

pub const PROGRESS_BUTTON_LABEL: &str = "Ver etapas";
pub const PROGRESS_SECTION_TITLE: &str = "Progresso do Orçamento";

pub const OPTIONS_BUTTON_LABEL: &str = "Ver opções";
pub const OPTIONS_SECTION_TITLE: &str = "Escolha uma";

pub fn progress_menu_body(remaining: usize) -> String {
    format!("Faltam {remaining} etapas. Selecione qual deseja responder:")
}

pub fn text_question_body(question: &str) -> String {
    format!("{question}\n\n(Digite *humano* a qualquer momento para falar com um consultor)")
}

pub fn resume_body(step_title: &str) -> String {
    format!(
        "Olá novamente! Você parou na etapa *{step_title}*. Por favor, continue para que possamos finalizar seu orçamento."
    )
}
