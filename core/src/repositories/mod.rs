pub mod account;

pub use account::AccountRepository;

#[cfg(test)]
pub use account::MockAccountRepository;
