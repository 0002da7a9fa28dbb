mod dynamic;
mod map;
mod pointer;
mod scalar;
mod seq;
mod string;
