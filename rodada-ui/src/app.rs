use crate::bridge;
use crate::display::{Page, admin_gate, jersey_label, mxn, short_date};
use leptos::*;
use rodada_schema::form::{FormError, ReceiptPolicy, RegistrationForm};
use rodada_schema::pricing::{JerseySize, PriceTable};
use rodada_schema::records::{DashboardSnapshot, PriceEntry, price_list};
use wasm_bindgen_futures::spawn_local;

#[derive(Clone, Debug, PartialEq)]
struct Alert {
    success: bool,
    message: String,
}

#[component]
pub fn App() -> impl IntoView {
    match Page::from_path(&bridge::current_path()) {
        Page::Admin => view! { <AdminPage/> }.into_view(),
        Page::Login => view! { <LoginPage/> }.into_view(),
        Page::Register => view! { <RegisterPage/> }.into_view(),
    }
}

fn form_error_message(err: &FormError) -> String {
    match err {
        FormError::ReceiptRequired => "Sube tu comprobante de pago para solicitar jerseys.".into(),
        FormError::InvalidNumber { .. } => "Las edades deben ser números enteros.".into(),
        FormError::Invalid(detail) => format!("Revisa los datos del registro: {detail}"),
    }
}

#[component]
fn SizeSelect(
    prices: RwSignal<Vec<PriceEntry>>,
    #[prop(into)] selected: Signal<Option<JerseySize>>,
    on_pick: Callback<Option<JerseySize>>,
) -> impl IntoView {
    view! {
      <select
        required
        prop:value=move || selected.get().map(|s| s.label().to_string()).unwrap_or_default()
        on:change=move |ev| on_pick.call(event_target_value(&ev).parse::<JerseySize>().ok())
      >
        <option value="">"Selecciona talla"</option>
        <For
          each=move || prices.get()
          key=|p| p.size.clone()
          children=move |p| view! {
            <option value=p.size.clone()>{format!("{} - {}", p.size, mxn(u64::from(p.price)))}</option>
          }
        />
      </select>
    }
}

#[component]
fn RegisterPage() -> impl IntoView {
    let form = create_rw_signal(RegistrationForm::new());
    let table = store_value(PriceTable::standard());
    let prices = create_rw_signal(price_list(&PriceTable::standard()));
    let policy = create_rw_signal(ReceiptPolicy::default());
    let alert = create_rw_signal(None::<Alert>);
    let submitting = create_rw_signal(false);
    let receipt_input = create_node_ref::<html::Input>();

    spawn_local(async move {
        match bridge::fetch_form_settings().await {
            Ok(settings) => {
                prices.set(settings.prices);
                policy.set(settings.receipt_policy);
            }
            Err(e) => logging::warn!("form settings unavailable: {e}"),
        }
    });

    let jerseys = move || form.with(|f| f.jersey_count());
    let total = move || form.with(|f| f.total_payable(&table.get_value()));

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }

        let receipt = receipt_input
            .get_untracked()
            .and_then(|input| input.files())
            .and_then(|files| files.get(0));
        let payload = form.with_untracked(|f| {
            f.to_payload(&table.get_value(), policy.get_untracked(), receipt.is_some())
        });
        let payload = match payload {
            Ok(payload) => payload,
            Err(err) => {
                alert.set(Some(Alert {
                    success: false,
                    message: form_error_message(&err),
                }));
                return;
            }
        };

        submitting.set(true);
        spawn_local(async move {
            match bridge::submit_registration(&payload, receipt).await {
                Ok(outcome) => {
                    if outcome.companions_failed > 0 {
                        logging::warn!(
                            "registration {} saved with {} companion(s) missing",
                            outcome.registration_id,
                            outcome.companions_failed
                        );
                    }
                    form.update(RegistrationForm::reset);
                    if let Some(input) = receipt_input.get_untracked() {
                        input.set_value("");
                    }
                    alert.set(Some(Alert {
                        success: true,
                        message: "¡Registro guardado correctamente! 🎉".into(),
                    }));
                }
                Err(message) => alert.set(Some(Alert {
                    success: false,
                    message,
                })),
            }
            submitting.set(false);
        });
    };

    let pick_main_size = Callback::new(move |size| form.update(|f| f.set_jersey_size(size)));

    view! {
      <main class="register">
        <Show when=move || alert.get().is_some() fallback=|| ()>
          <div class="modal" on:click=move |_| alert.set(None)>
            <div class=move || {
              if alert.get().is_some_and(|a| a.success) { "modal-card ok" } else { "modal-card warn" }
            }>
              <p>{move || alert.get().map(|a| a.message).unwrap_or_default()}</p>
              <button on:click=move |_| alert.set(None)>"Aceptar"</button>
            </div>
          </div>
        </Show>

        <h1>"Registro al Evento"</h1>
        <form class="stack" on:submit=submit>
          <input
            required
            placeholder="Nombre completo"
            prop:value=move || form.with(|f| f.name.clone())
            on:input=move |ev| form.update(|f| f.name = event_target_value(&ev))
          />
          <input
            required
            placeholder="Lugar de procedencia"
            prop:value=move || form.with(|f| f.origin.clone())
            on:input=move |ev| form.update(|f| f.origin = event_target_value(&ev))
          />
          <input
            required
            type="number"
            placeholder="Edad"
            prop:value=move || form.with(|f| f.age.clone())
            on:input=move |ev| form.update(|f| f.age = event_target_value(&ev))
          />

          <label>"¿Deseas el jersey oficial?"</label>
          <select
            prop:value=move || if form.with(|f| f.jersey.wanted) { "si" } else { "no" }
            on:change=move |ev| {
              let wanted = event_target_value(&ev) == "si";
              form.update(|f| f.set_jersey_wanted(wanted));
            }
          >
            <option value="no">"No, gracias"</option>
            <option value="si">"Sí, lo quiero"</option>
          </select>
          <Show when=move || form.with(|f| f.jersey.wanted) fallback=|| ()>
            <SizeSelect
              prices=prices
              selected=Signal::derive(move || form.with(|f| f.jersey.size))
              on_pick=pick_main_size
            />
          </Show>

          <button type="button" on:click=move |_| form.update(RegistrationForm::add_companion)>
            "+ Agregar acompañante"
          </button>

          <For
            each=move || 0..form.with(|f| f.companions.len())
            key=|index| *index
            children=move |index| {
              let pick_size = Callback::new(move |size| {
                form.update(|f| {
                  if let Some(c) = f.companion_mut(index) {
                    c.jersey.size = size;
                  }
                })
              });
              view! {
                <fieldset class="companion">
                  <button type="button" class="remove" on:click=move |_| {
                    form.update(|f| {
                      f.remove_companion(index);
                    })
                  }>"✕"</button>
                  <input
                    placeholder="Nombre del acompañante"
                    prop:value=move || form.with(|f| f.companions.get(index).map(|c| c.name.clone()).unwrap_or_default())
                    on:input=move |ev| form.update(|f| {
                      if let Some(c) = f.companion_mut(index) {
                        c.name = event_target_value(&ev);
                      }
                    })
                  />
                  <input
                    type="number"
                    placeholder="Edad"
                    prop:value=move || form.with(|f| f.companions.get(index).map(|c| c.age.clone()).unwrap_or_default())
                    on:input=move |ev| form.update(|f| {
                      if let Some(c) = f.companion_mut(index) {
                        c.age = event_target_value(&ev);
                      }
                    })
                  />
                  <select
                    prop:value=move || {
                      let wanted = form.with(|f| f.companions.get(index).is_some_and(|c| c.jersey.wanted));
                      if wanted { "si" } else { "no" }
                    }
                    on:change=move |ev| {
                      let wanted = event_target_value(&ev) == "si";
                      form.update(|f| {
                        if let Some(c) = f.companion_mut(index) {
                          c.jersey.set_wanted(wanted);
                        }
                      });
                    }
                  >
                    <option value="no">"Sin Jersey"</option>
                    <option value="si">"Con Jersey"</option>
                  </select>
                  <Show
                    when=move || form.with(|f| f.companions.get(index).is_some_and(|c| c.jersey.wanted))
                    fallback=|| ()
                  >
                    <SizeSelect
                      prices=prices
                      selected=Signal::derive(move || {
                        form.with(|f| f.companions.get(index).and_then(|c| c.jersey.size))
                      })
                      on_pick=pick_size
                    />
                  </Show>
                </fieldset>
              }
            }
          />

          <Show when=move || { jerseys() > 0 } fallback=|| ()>
            <div class="totals">
              <div>"Jerseys solicitados: " <b>{jerseys}</b></div>
              <div>"Total a pagar: " <b>{move || mxn(u64::from(total()))}</b></div>
              <label>
                {move || match policy.get() {
                  ReceiptPolicy::Required => "Comprobante de pago (obligatorio)",
                  ReceiptPolicy::Optional => "Comprobante de pago",
                }}
              </label>
              <input type="file" accept="image/png,image/jpeg,image/webp,image/heic" node_ref=receipt_input/>
            </div>
          </Show>

          <button type="submit" prop:disabled=move || submitting.get()>
            {move || if submitting.get() { "Enviando..." } else { "Confirmar Registro" }}
          </button>
        </form>
      </main>
    }
}

#[component]
fn LoginPage() -> impl IntoView {
    let email = create_rw_signal(String::new());
    let password = create_rw_signal(String::new());
    let error = create_rw_signal(None::<String>);

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let (email, password) = (email.get_untracked(), password.get_untracked());
        spawn_local(async move {
            match bridge::login(&email, &password).await {
                Ok(_) => bridge::navigate("/admin"),
                Err(message) => error.set(Some(message)),
            }
        });
    };

    view! {
      <main class="login">
        <h1>"Login Administrador"</h1>
        <form class="stack" on:submit=submit>
          <input
            required
            type="email"
            placeholder="Correo electrónico"
            on:input=move |ev| email.set(event_target_value(&ev))
          />
          <input
            required
            type="password"
            placeholder="Contraseña"
            on:input=move |ev| password.set(event_target_value(&ev))
          />
          <Show when=move || error.get().is_some() fallback=|| ()>
            <p class="error">{move || error.get().unwrap_or_default()}</p>
          </Show>
          <button type="submit">"Ingresar"</button>
          <a href="/">"← Volver al inicio"</a>
        </form>
      </main>
    }
}

#[component]
fn AdminPage() -> impl IntoView {
    let viewer = create_rw_signal(None::<String>);
    let snapshot = create_rw_signal(None::<DashboardSnapshot>);
    let error = create_rw_signal(None::<String>);
    let stream = store_value(None::<web_sys::EventSource>);
    on_cleanup(move || {
        stream.try_with_value(|source| {
            if let Some(source) = source {
                source.close();
            }
        });
    });

    spawn_local(async move {
        let session = match bridge::fetch_session().await {
            Ok(session) => session,
            Err(e) => {
                error.set(Some(e));
                return;
            }
        };

        let decision = admin_gate(session.as_ref());
        if let Some(target) = decision.redirect_target() {
            bridge::navigate(target);
            return;
        }
        let email = session.map(|s| s.email);
        viewer.set(email);

        let subscribed = bridge::subscribe_dashboard(
            move |next| {
                snapshot.set(Some(next));
                error.set(None);
            },
            move |message| error.set(Some(message)),
        );
        match subscribed {
            Ok(source) => stream.set_value(Some(source)),
            Err(e) => error.set(Some(e)),
        }
    });

    let logout = move |_| {
        spawn_local(async move {
            if let Err(e) = bridge::logout().await {
                logging::warn!("logout failed: {e}");
            }
            bridge::navigate("/login");
        });
    };

    let stats = move || snapshot.with(|s| s.as_ref().map(|s| s.stats).unwrap_or_default());
    let rows = move || snapshot.with(|s| s.as_ref().map(|s| s.registrations.clone()).unwrap_or_default());

    view! {
      <Show
        when=move || viewer.get().is_some()
        fallback=move || view! {
          <main class="admin loading">
            <p>"Cargando registros del evento..."</p>
            <pre class="error">{move || error.get().unwrap_or_default()}</pre>
          </main>
        }
      >
        <main class="admin">
          <header class="row">
            <div>
              <h1>"Panel de Control"</h1>
              <p>"Bienvenida, " <b>{move || viewer.get().unwrap_or_default()}</b></p>
            </div>
            <button on:click=logout>"Cerrar sesión"</button>
          </header>

          <section class="stats">
            <div class="card">
              <h3>"Registros Totales"</h3>
              <p>{move || stats().registrations}</p>
            </div>
            <div class="card">
              <h3>"Jerseys Apartados"</h3>
              <p>{move || stats().jerseys}</p>
            </div>
            <div class="card">
              <h3>"Ingresos Previstos"</h3>
              <p>{move || mxn(stats().revenue)}</p>
            </div>
          </section>

          <Show when=move || error.get().is_some() fallback=|| ()>
            <p class="warn">{move || error.get().unwrap_or_default()}</p>
          </Show>

          <table>
            <thead>
              <tr>
                <th>"Nombre / Procedencia"</th>
                <th>"Edad"</th>
                <th>"Jerseys"</th>
                <th>"Talla Principal"</th>
                <th>"Acompañantes"</th>
                <th>"Total Pago"</th>
                <th>"Comprobante"</th>
                <th>"Fecha Reg."</th>
              </tr>
            </thead>
            <tbody>
              <For
                each=rows
                key=|r| r.id
                children=move |r| {
                  let companions = r
                    .companions
                    .iter()
                    .map(|c| format!("{} ({}, {})", c.name, c.age, jersey_label(&c.jersey)))
                    .collect::<Vec<_>>()
                    .join(", ");
                  view! {
                    <tr>
                      <td><b>{r.name.clone()}</b><div class="meta">{r.origin.clone()}</div></td>
                      <td>{r.age}</td>
                      <td>{r.total_jerseys}</td>
                      <td>{jersey_label(&r.jersey)}</td>
                      <td class="meta">{companions}</td>
                      <td><b>{mxn(u64::from(r.total_due))}</b></td>
                      <td>
                        {r.receipt.clone().map(|receipt| view! {
                          <a href=receipt.url target="_blank">"Ver"</a>
                        })}
                      </td>
                      <td class="meta">{short_date(&r.created_at)}</td>
                    </tr>
                  }
                }
              />
            </tbody>
          </table>
          <Show when=move || snapshot.with(|s| s.as_ref().is_some_and(|s| s.registrations.is_empty())) fallback=|| ()>
            <p class="meta">"No hay registros confirmados todavía."</p>
          </Show>
        </main>
      </Show>
    }
}
