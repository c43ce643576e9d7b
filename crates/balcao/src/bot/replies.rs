//! Texts sent to contacts.
//!
//! WhatsApp formatting applies: `*bold*`, `_italic_`.

/// Time-of-day salutation for the menu header.
pub fn salutation(local_hour: u32) -> &'static str {
    match local_hour {
        5..=11 => "Bom dia",
        12..=17 => "Boa tarde",
        _ => "Boa noite",
    }
}

/// First word of the contact's profile name, or a neutral fallback.
pub fn first_name(display_name: Option<&str>) -> &str {
    display_name
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or("cliente")
}

pub fn main_menu(salutation: &str, name: &str) -> String {
    format!(
        "{salutation}, *{name}*! 👋, tudo bem?\n\
         \n\
         Escolha uma das opções abaixo:\n\
         \n\
         🛍️  *[1]* Falar com um Vendedor;\n\
         💰  *[2]* Financeiro (Boletos, Pagamentos);\n\
         💼  *[3]* Trabalhe Conosco;\n\
         🔔  *[4]* Ofertas e Novidades;\n\
         📍  *[5]* Localização da Loja;\n\
         📑  *[6]* Catálogos de Produtos.\n\
         \n\
         ✳️ _Digite o número da opção desejada._\n\
         ❗ _A qualquer momento, envie *MENU* para voltar ao início._"
    )
}

pub const CONFIRM_EXIT: &str = "⚠️ *Confirmação:* Você realmente deseja encerrar o atendimento?\n\nDigite *SIM* para confirmar ou *MENU* para continuar.";

pub const SESSION_CLOSED: &str =
    "✅ Atendimento *encerrado com sucesso.*\n\nQuando quiser, é só digitar *MENU* para começar de novo.";

pub const GREET_FIRST: &str =
    "👋 Por favor, digite *OI*, *MENU* ou outra saudação para iniciar o atendimento.";

pub const SELLER: &str = "📞 Um *vendedor* entrará em contato com você em breve.";

pub const BILLING: &str = "💰 Envie seu *NOME*, *CPF* ou *CNPJ* para localizar seus dados.";

pub const CAREERS: &str = "🚀 Envie seu *currículo* e dados para candidatura neste chat.";

pub const OFFERS: &str = "🔔 Você receberá nossas *ofertas exclusivas* em breve!";

pub fn store_location(url: &str) -> String {
    format!("📍 Localização da loja: {url}")
}

pub const INVALID_OPTION: &str = "❌ *Opção inválida.* Envie um número válido do *MENU*.";

pub const CATALOG_DIR_MISSING: &str = "❌ *A pasta de PDFs não foi encontrada.*";

pub const NO_CATALOGS: &str = "⚠️ *Nenhum catálogo PDF encontrado.*";

/// Numbered catalog list; `0` stands for "all of them".
pub fn catalog_listing(items: &[String]) -> String {
    let mut listing = String::from("📚 *Catálogos disponíveis:*\n\n");
    listing.push_str("*0* - 📥 *Baixar TODOS os catálogos*\n\n");
    for (index, item) in items.iter().enumerate() {
        listing.push_str(&format!("*{}* - {}\n", index + 1, item));
    }
    listing.push_str("\n✳️ *Digite o número do catálogo desejado.*");
    listing
}

pub const INVALID_CATALOG: &str = "❌ *Opção inválida.* Envie apenas o número do PDF desejado.";

pub const SENDING_ALL: &str = "⏳ Enviando *todos os catálogos*. Aguarde...";

pub const ALL_SENT: &str = "✅ *Todos os catálogos foram enviados.*\n\n🔄 Retornando ao menu principal...";

pub const PROCESSING: &str = "⏳ Processando sua escolha. Aguarde...";

pub const RETURNING: &str = "🔄 Retornando ao menu principal...";

pub fn bulk_caption(item: &str) -> String {
    format!("📎 *{item}*")
}

pub fn single_caption(item: &str) -> String {
    format!("📎 Aqui está o arquivo: *{item}*")
}

pub const IDLE_WARNING: &str =
    "👋 Oi! Estou aqui se precisar de ajuda. Para voltar ao menu, digite *MENU*.";

pub const IDLE_CLOSED: &str =
    "🚫 Atendimento *encerrado por inatividade.* Digite *MENU* para começar de novo.";
