// ABOUTME: Deterministic template strategy for proposal content
// ABOUTME: Interpolates proposal fields into fixed Portuguese sentences; every section is always filled

use proposekit_core::{format_currency, ProposalContent, ProposalDetails};

/// Bullet used when the issuer left the scope blank
pub const DEFAULT_SCOPE_ITEM: &str = "Execução dos serviços conforme alinhamento inicial.";

/// Split free-text scope on newlines, commas and semicolons
pub fn split_scope(scope: &str) -> Vec<String> {
    scope
        .split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().unwrap_or(default)
}

/// Build every section from the proposal fields alone
pub fn render_template(details: &ProposalDetails) -> ProposalContent {
    let introduction = format!(
        "Esta proposta descreve os termos para a execução do projeto {}, desenvolvido sob medida para {}.",
        or_default(&details.title, "de Consultoria"),
        details.client_name
    );

    let mut context = vec![format!(
        "O objetivo central deste trabalho é {}.",
        or_default(&details.objective, "atender à demanda solicitada")
    )];
    if let Some(urgency) = &details.urgency_reason {
        context.push(format!(
            "Entendemos que este projeto é prioritário pois {}.",
            urgency
        ));
    }
    if let Some(cost) = &details.cost_of_inaction {
        context.push(format!(
            "Além disso, identificamos que a inércia neste momento pode resultar em {}.",
            cost
        ));
    }

    let mut scope = details
        .scope
        .as_deref()
        .map(split_scope)
        .unwrap_or_default();
    if scope.is_empty() {
        scope.push(DEFAULT_SCOPE_ITEM.to_string());
    }

    let out_of_scope = details.out_of_scope.as_ref().map(|excluded| {
        format!(
            "Para evitar dúvidas futuras e garantir o foco na entrega contratada, este projeto não contempla: {}.",
            excluded
        )
    });

    let mut operation = vec![format!(
        "A gestão do projeto será realizada através de {} para garantir o registro e a fluidez das informações.",
        or_default(&details.communication, "canais oficiais")
    )];
    if let Some(decision_maker) = &details.decision_maker {
        operation.push(format!(
            "A aprovação final dos entregáveis caberá a {}.",
            decision_maker
        ));
    }
    if let Some(dependencies) = &details.dependencies {
        operation.push(format!(
            "Para o sucesso do cronograma, mapeamos as seguintes dependências cruciais: {}.",
            dependencies
        ));
    }

    let investment = format!(
        "O investimento total para a execução deste projeto é de {}.",
        format_currency(details.project_value)
    );

    let timeline = format!(
        "Estima-se a conclusão do projeto em {}, condicionado à aprovação dos entregáveis e disponibilização dos acessos necessários.",
        or_default(&details.deadline, "datas a definir")
    );

    ProposalContent {
        introduction,
        context: context.join(" "),
        scope,
        out_of_scope,
        operation: operation.join(" "),
        investment,
        commercial_conditions: or_default(&details.payment_conditions, "A combinar.").to_string(),
        timeline,
        next_steps: "Para dar início ao projeto, é necessário confirmar esta proposta e seguir com o acordo conforme as condições descritas acima.".to_string(),
    }
}
